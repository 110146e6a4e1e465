//! Read-only checks on the local clone

use serde::Serialize;
use tracing::{debug, instrument};

use crate::git::Vcs;
use crate::Result;

/// State of the local clone before anything is changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub is_repo: bool,
    pub is_detached: bool,
    /// Tracked modifications or staged changes; untracked files are ignored
    pub has_uncommitted: bool,
    pub is_shallow: bool,
}

/// Inspect the repository without modifying it
///
/// Outside a work tree every other field is reported as false and no further
/// queries are made.
#[instrument(skip_all)]
pub fn probe(vcs: &dyn Vcs) -> Result<ProbeReport> {
    if !vcs.is_work_tree()? {
        return Ok(ProbeReport::default());
    }

    let report = ProbeReport {
        is_repo: true,
        is_detached: vcs.is_head_detached()?,
        has_uncommitted: vcs.has_uncommitted_changes()?,
        is_shallow: vcs.is_shallow()?,
    };
    debug!(?report, "probed repository");
    Ok(report)
}
