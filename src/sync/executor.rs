//! Sync executor: checkout, refresh, integrate
//!
//! # Integration state machine
//!
//! ```text
//! merge + ff-only ──► merge --ff-only ──ok──► FastForwarded
//!                          │
//!                    diverged │          other failure ──► InfrastructureFailure
//!                          ▼
//! merge ─────────────► merge --no-edit ──ok──► Merged
//!                          │
//!                          └──conflict──► ConflictStopped
//!
//! rebase ────────────► rebase ──ok──► Rebased
//!                          └──conflict──► ConflictStopped
//! ```
//!
//! A conflict leaves the merge or rebase in progress exactly as git left it.

use serde::Serialize;
use std::fmt;
use tracing::{info, instrument, warn};

use crate::git::conflict::{self, Failure};
use crate::git::Vcs;
use crate::request::{SyncMethod, SyncRequest};
use crate::sync::branch::DefaultBranch;
use crate::sync::remotes::ORIGIN;
use crate::{Error, Result};

/// Terminal state of the integration step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    FastForwarded,
    Merged,
    Rebased,
    ConflictStopped,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SyncOutcome::FastForwarded => "fast-forwarded",
            SyncOutcome::Merged => "merged",
            SyncOutcome::Rebased => "rebased",
            SyncOutcome::ConflictStopped => "stopped on conflicts",
        };
        f.write_str(text)
    }
}

/// Outcome plus the conflicting paths when it is [`SyncOutcome::ConflictStopped`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Integration {
    pub outcome: SyncOutcome,
    pub conflicts: Vec<String>,
}

impl Integration {
    fn done(outcome: SyncOutcome) -> Self {
        Self {
            outcome,
            conflicts: Vec::new(),
        }
    }
}

/// How the local branch was put in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkout {
    /// Existing local branch checked out
    Existing,
    /// Existing branch checked out and tracking set to `origin/<branch>`
    TrackingSet,
    /// Created from `origin/<branch>`, tracking it
    CreatedFromOrigin,
    /// Created from `upstream/<branch>` because origin lacks it
    CreatedFromUpstream,
}

/// Force-checkout the default branch, creating it or its tracking as needed
#[instrument(skip_all, fields(branch = %branch))]
pub fn checkout(vcs: &dyn Vcs, branch: &DefaultBranch) -> Result<Checkout> {
    let name = branch.name.as_str();
    let origin_ref = format!("{ORIGIN}/{name}");
    let origin_has_it = vcs.remote_tracking_ref_exists(ORIGIN, name)?;

    if vcs.local_branch_exists(name)? {
        vcs.git(&["checkout", "--force", name])?
            .check("checkout")?;

        if vcs.branch_upstream(name)?.is_some() || !origin_has_it {
            return Ok(Checkout::Existing);
        }
        let upstream_arg = format!("--set-upstream-to={origin_ref}");
        vcs.git(&["branch", &upstream_arg, name])?
            .check("branch --set-upstream-to")?;
        info!(tracking = %origin_ref, "configured branch tracking");
        return Ok(Checkout::TrackingSet);
    }

    if origin_has_it {
        vcs.git(&["checkout", "--force", "-B", name, "--track", &origin_ref])?
            .check("checkout")?;
        info!(tracking = %origin_ref, "created local branch");
        Ok(Checkout::CreatedFromOrigin)
    } else {
        let upstream_ref = branch.upstream_ref();
        vcs.git(&["checkout", "--force", "-B", name, "--no-track", &upstream_ref])?
            .check("checkout")?;
        warn!(start = %upstream_ref, "origin has no '{}', created local branch from upstream", name);
        Ok(Checkout::CreatedFromUpstream)
    }
}

/// Fetch `remote` with pruning, optionally mirroring tags
#[instrument(skip(vcs))]
pub fn fetch(vcs: &dyn Vcs, remote: &str, tags: bool) -> Result<()> {
    let mut args = vec!["fetch", "--prune"];
    if tags {
        args.push("--tags");
    }
    args.push(remote);

    vcs.git(&args)?.check(&format!("fetch {remote}"))?;
    info!(remote, tags, "fetched");
    Ok(())
}

/// Integrate `upstream/<branch>` into the checked-out branch
#[instrument(skip_all, fields(branch = %branch, method = %request.method()))]
pub fn integrate(vcs: &dyn Vcs, request: &SyncRequest, branch: &DefaultBranch) -> Result<Integration> {
    let target = branch.upstream_ref();

    let integration = match request.method() {
        SyncMethod::Merge if request.fast_forward_only() => {
            if fast_forward(vcs, &target)? {
                Integration::done(SyncOutcome::FastForwarded)
            } else {
                info!("history diverged, falling back to a merge commit");
                merge(vcs, &target)?
            }
        }
        SyncMethod::Merge => merge(vcs, &target)?,
        SyncMethod::Rebase => rebase(vcs, &target)?,
    };

    match integration.outcome {
        SyncOutcome::ConflictStopped => {
            warn!(paths = ?integration.conflicts, "{} of {} stopped on conflicts", request.method(), target)
        }
        outcome => info!(%outcome, onto = %target, "integrated"),
    }
    Ok(integration)
}

/// `Ok(false)` only when git refused because the histories diverged
fn fast_forward(vcs: &dyn Vcs, target: &str) -> Result<bool> {
    let output = vcs.git(&["merge", "--ff-only", target])?;
    if output.success() {
        return Ok(true);
    }
    match conflict::classify_fast_forward(&output) {
        Failure::NotFastForward => Ok(false),
        Failure::Conflict(_) | Failure::Other(_) => {
            Err(Error::infra("merge --ff-only", output.summary()))
        }
    }
}

fn merge(vcs: &dyn Vcs, target: &str) -> Result<Integration> {
    let output = vcs.git(&["merge", "--no-edit", target])?;
    if output.success() {
        return Ok(Integration::done(SyncOutcome::Merged));
    }
    stopped(vcs, "merge", &output)
}

fn rebase(vcs: &dyn Vcs, target: &str) -> Result<Integration> {
    let output = vcs.git(&["rebase", target])?;
    if output.success() {
        return Ok(Integration::done(SyncOutcome::Rebased));
    }
    stopped(vcs, "rebase", &output)
}

fn stopped(vcs: &dyn Vcs, operation: &str, output: &crate::git::GitOutput) -> Result<Integration> {
    let index_conflicts = vcs.conflicted_paths()?;
    match conflict::classify_integration(output, &index_conflicts) {
        Failure::Conflict(conflicts) => Ok(Integration {
            outcome: SyncOutcome::ConflictStopped,
            conflicts,
        }),
        Failure::NotFastForward | Failure::Other(_) => {
            Err(Error::infra(operation, output.summary()))
        }
    }
}
