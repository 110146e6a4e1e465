//! Push coordinator
//!
//! Pushing happens only after a successful integration and only when asked
//! for. A rejected push leaves the already-integrated local branch as it is.

use serde::Serialize;
use tracing::{info, instrument};

use crate::git::Vcs;
use crate::request::SyncRequest;
use crate::sync::branch::DefaultBranch;
use crate::sync::executor::SyncOutcome;
use crate::sync::remotes::ORIGIN;
use crate::{Error, Result};

/// What was sent to `origin`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub branch_pushed: bool,
    pub tags_pushed: bool,
}

/// Push the branch (and tags, if mirroring them) to `origin`
#[instrument(skip_all, fields(branch = %branch, %outcome))]
pub fn push_if_requested(
    vcs: &dyn Vcs,
    outcome: SyncOutcome,
    request: &SyncRequest,
    branch: &DefaultBranch,
) -> Result<PushReport> {
    if outcome == SyncOutcome::ConflictStopped || !request.push() {
        return Ok(PushReport::default());
    }

    let name = branch.name.as_str();
    let output = vcs.git(&["push", ORIGIN, name])?;
    if !output.success() {
        return Err(Error::PushFailed {
            refspec: name.to_string(),
            message: output.summary(),
        });
    }
    info!(branch = name, "pushed to origin");

    if !request.sync_tags() {
        return Ok(PushReport {
            branch_pushed: true,
            tags_pushed: false,
        });
    }

    let output = vcs.git(&["push", ORIGIN, "--tags"])?;
    if !output.success() {
        return Err(Error::PushFailed {
            refspec: "--tags".to_string(),
            message: output.summary(),
        });
    }
    info!("pushed tags to origin");

    Ok(PushReport {
        branch_pushed: true,
        tags_pushed: true,
    })
}
