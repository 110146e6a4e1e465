//! The synchronization pipeline
//!
//! ```text
//! probe ─► remotes ─► history repair ─► fetch upstream [+tags]
//!       ─► resolve branch ─► checkout ─► fetch origin ─► integrate ─► push
//! ```
//!
//! Every stage is a gate: the first fatal error stops the run and nothing is
//! retried. Shallow-history repair is the only stage whose failure is
//! downgraded to a warning.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::confirm::Confirm;
use crate::git::Vcs;
use crate::request::SyncRequest;
use crate::{Error, Result};

pub mod branch;
pub mod executor;
pub mod history;
pub mod probe;
pub mod push;
pub mod remotes;

#[cfg(test)]
pub(crate) mod testing;

pub use branch::{BranchSource, DefaultBranch};
pub use executor::{Checkout, Integration, SyncOutcome};
pub use history::Repair;
pub use probe::ProbeReport;
pub use push::PushReport;
pub use remotes::RemoteState;

/// Question asked before running with uncommitted changes
pub const UNCOMMITTED_PROMPT: &str =
    "Uncommitted changes to tracked files will be discarded by the forced checkout. Continue?";

/// Everything a successful run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub branch: DefaultBranch,
    pub outcome: SyncOutcome,
    /// HEAD did not move: upstream had nothing new
    pub up_to_date: bool,
    pub head_before: Option<String>,
    pub head_after: Option<String>,
    pub probe: ProbeReport,
    pub remotes: RemoteState,
    pub history: Repair,
    pub checkout: Checkout,
    pub push: PushReport,
}

/// Drives one run against a repository handle
pub struct Pipeline<'a> {
    vcs: &'a dyn Vcs,
    confirm: &'a mut dyn Confirm,
}

impl<'a> Pipeline<'a> {
    pub fn new(vcs: &'a dyn Vcs, confirm: &'a mut dyn Confirm) -> Self {
        Self { vcs, confirm }
    }

    /// Run every stage in order
    ///
    /// A conflict is reported as [`Error::SyncConflict`] after the push stage
    /// has declined to run, with the merge or rebase still in progress.
    #[instrument(skip_all, fields(method = %request.method(), push = request.push()))]
    pub fn run(&mut self, request: &SyncRequest) -> Result<SyncReport> {
        let vcs = self.vcs;

        let probe = probe::probe(vcs)?;
        if !probe.is_repo {
            return Err(Error::NotARepository {
                path: vcs.path().to_path_buf(),
            });
        }
        if probe.is_detached {
            warn!("HEAD is detached; the default branch will be checked out");
        }
        if probe.has_uncommitted && !self.confirm.confirm(UNCOMMITTED_PROMPT) {
            return Err(Error::UncommittedChangesDeclined);
        }

        let remotes = remotes::ensure_remotes(vcs, request.upstream_url())?;
        let history = history::repair_if_shallow(vcs, probe.is_shallow)?;

        executor::fetch(vcs, remotes::UPSTREAM, request.sync_tags())?;
        let branch = branch::resolve(vcs)?;

        let checkout = executor::checkout(vcs, &branch)?;
        let head_before = vcs.head_oid()?;
        executor::fetch(vcs, remotes::ORIGIN, false)?;

        let integration = executor::integrate(vcs, request, &branch)?;
        let push = push::push_if_requested(vcs, integration.outcome, request, &branch)?;

        if integration.outcome == SyncOutcome::ConflictStopped {
            return Err(Error::SyncConflict {
                method: request.method(),
                target: branch.upstream_ref(),
                paths: integration.conflicts,
            });
        }

        let head_after = vcs.head_oid()?;
        let up_to_date = head_before == head_after;
        if up_to_date {
            info!(branch = %branch, "already up to date");
        }

        Ok(SyncReport {
            branch,
            outcome: integration.outcome,
            up_to_date,
            head_before,
            head_after,
            probe,
            remotes,
            history,
            checkout,
            push,
        })
    }
}
