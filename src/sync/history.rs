//! Shallow-clone repair
//!
//! Merge and rebase need the merge base, which a shallow clone may not have.
//! Repair is best-effort: a clone that stays shallow but deep enough still
//! syncs fine, so failing here only produces a warning.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::git::Vcs;
use crate::sync::remotes::ORIGIN;
use crate::{Error, Result};

/// Depth fetched when the server refuses `--unshallow`
pub const FALLBACK_DEPTH: u32 = 100_000;

/// What repair did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum Repair {
    NotShallow,
    Unshallowed,
    /// `--unshallow` failed, the bounded-depth fetch worked
    Deepened,
    /// Both attempts failed; the run continues
    Failed(String),
}

/// Unshallow the clone if it is shallow
#[instrument(skip(vcs))]
pub fn repair_if_shallow(vcs: &dyn Vcs, is_shallow: bool) -> Result<Repair> {
    if !is_shallow {
        return Ok(Repair::NotShallow);
    }

    info!("shallow clone detected, fetching full history");
    let full = vcs.git(&["fetch", "--unshallow", ORIGIN])?;
    if full.success() {
        return Ok(Repair::Unshallowed);
    }
    warn!(reason = %full.summary(), "--unshallow failed, trying depth {}", FALLBACK_DEPTH);

    let depth = format!("--depth={FALLBACK_DEPTH}");
    let bounded = vcs.git(&["fetch", &depth, ORIGIN])?;
    if bounded.success() {
        return Ok(Repair::Deepened);
    }

    let err = Error::HistoryRepairFailed {
        message: bounded.summary(),
    };
    warn!("{}; continuing with shallow history", err);
    Ok(Repair::Failed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitOutput;
    use crate::sync::testing::FakeVcs;

    #[test]
    fn test_deep_clone_untouched() {
        let vcs = FakeVcs::new();
        assert_eq!(repair_if_shallow(&vcs, false).unwrap(), Repair::NotShallow);
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn test_unshallow() {
        let vcs = FakeVcs::new();
        assert_eq!(repair_if_shallow(&vcs, true).unwrap(), Repair::Unshallowed);
        assert_eq!(vcs.calls(), vec!["fetch --unshallow origin"]);
    }

    #[test]
    fn test_depth_fallback() {
        let vcs = FakeVcs::new().respond(
            "fetch --unshallow",
            GitOutput::failed(128, "fatal: the remote end hung up unexpectedly"),
        );
        assert_eq!(repair_if_shallow(&vcs, true).unwrap(), Repair::Deepened);
        assert_eq!(
            vcs.calls(),
            vec!["fetch --unshallow origin", "fetch --depth=100000 origin"]
        );
    }

    #[test]
    fn test_failure_is_not_fatal() {
        let vcs = FakeVcs::new()
            .respond("fetch --unshallow", GitOutput::failed(128, "fatal: nope"))
            .respond("fetch --depth", GitOutput::failed(128, "fatal: still nope"));

        match repair_if_shallow(&vcs, true).unwrap() {
            Repair::Failed(message) => assert!(message.contains("still nope")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
