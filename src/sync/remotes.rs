//! Remote registry: `origin` must exist, `upstream` is created on demand
//!
//! An existing `upstream` is never redirected. If its URL differs from the
//! requested one the run carries on against the configured URL and reports
//! the mismatch.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::git::Vcs;
use crate::{Error, Result};

pub const ORIGIN: &str = "origin";
pub const UPSTREAM: &str = "upstream";

/// Remotes as found (and possibly amended) at the start of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteState {
    pub origin_url: String,
    /// URL `upstream` points at after the registry ran
    pub upstream_url: String,
    /// `upstream` did not exist and was added
    pub upstream_created: bool,
    /// `upstream` existed with a URL other than the requested one
    pub upstream_url_mismatch: bool,
}

/// Make sure `origin` exists and `upstream` points somewhere
#[instrument(skip(vcs))]
pub fn ensure_remotes(vcs: &dyn Vcs, upstream_url: &str) -> Result<RemoteState> {
    let origin_url = vcs.remote_url(ORIGIN)?.ok_or(Error::MissingOriginRemote)?;

    match vcs.remote_url(UPSTREAM)? {
        None => {
            vcs.add_remote(UPSTREAM, upstream_url)?;
            info!(url = upstream_url, "added remote 'upstream'");
            Ok(RemoteState {
                origin_url,
                upstream_url: upstream_url.to_string(),
                upstream_created: true,
                upstream_url_mismatch: false,
            })
        }
        Some(existing) => {
            let mismatch = !same_url(&existing, upstream_url);
            if mismatch {
                warn!(
                    configured = %existing,
                    requested = upstream_url,
                    "remote 'upstream' points elsewhere; leaving it unchanged"
                );
            }
            Ok(RemoteState {
                origin_url,
                upstream_url: existing,
                upstream_created: false,
                upstream_url_mismatch: mismatch,
            })
        }
    }
}

/// URL equality ignoring a trailing slash or `.git` suffix
fn same_url(a: &str, b: &str) -> bool {
    fn normalize(url: &str) -> &str {
        let url = url.trim().trim_end_matches('/');
        url.strip_suffix(".git").unwrap_or(url)
    }
    normalize(a) == normalize(b)
}
