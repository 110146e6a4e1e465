//! Default branch resolution
//!
//! Sources, first match wins:
//!
//! 1. symbolic HEAD of `upstream`
//! 2. symbolic HEAD of `origin`
//! 3. a branch literally named `main`, on `upstream` then `origin`
//! 4. a branch literally named `master`, on `upstream` then `origin`
//!
//! A symbolic HEAD is asked of the server (`ls-remote --symref`) first. The
//! local `refs/remotes/<remote>/HEAD` is only consulted when the server does
//! not advertise one, since it is written at clone time and goes stale when
//! the remote renames its default branch. A failed query is an error, never
//! a reason to fall through to the next source.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, instrument};

use crate::git::Vcs;
use crate::sync::remotes::{ORIGIN, UPSTREAM};
use crate::{Error, Result};

/// Literal names probed when no remote advertises a HEAD
pub const FALLBACK_NAMES: [&str; 2] = ["main", "master"];

/// Where the branch name came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchSource {
    SymbolicHead { remote: String },
    NameProbe { remote: String },
}

/// The branch this run synchronizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultBranch {
    pub name: String,
    pub source: BranchSource,
}

impl DefaultBranch {
    /// `upstream/<name>`, the ref integrated into the local branch
    pub fn upstream_ref(&self) -> String {
        format!("{UPSTREAM}/{}", self.name)
    }
}

impl fmt::Display for DefaultBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Resolve the default branch
#[instrument(skip_all)]
pub fn resolve(vcs: &dyn Vcs) -> Result<DefaultBranch> {
    for remote in [UPSTREAM, ORIGIN] {
        if let Some(name) = symbolic_head(vcs, remote)? {
            info!(branch = %name, remote, "default branch from symbolic HEAD");
            return Ok(DefaultBranch {
                name,
                source: BranchSource::SymbolicHead {
                    remote: remote.to_string(),
                },
            });
        }
    }

    for name in FALLBACK_NAMES {
        for remote in [UPSTREAM, ORIGIN] {
            if branch_exists_on(vcs, remote, name)? {
                info!(branch = name, remote, "default branch from name probe");
                return Ok(DefaultBranch {
                    name: name.to_string(),
                    source: BranchSource::NameProbe {
                        remote: remote.to_string(),
                    },
                });
            }
        }
    }

    Err(Error::UnresolvableDefaultBranch)
}

/// Branch named by a remote's HEAD, if it advertises one
fn symbolic_head(vcs: &dyn Vcs, remote: &str) -> Result<Option<String>> {
    let output = vcs.git(&["ls-remote", "--symref", remote, "HEAD"])?;
    if !output.success() {
        return Err(Error::infra(format!("ls-remote {remote}"), output.summary()));
    }

    if let Some(name) = parse_symref(&output.stdout) {
        debug!(remote, branch = %name, "remote HEAD via ls-remote");
        return Ok(Some(name));
    }

    let local = vcs.remote_head(remote)?;
    debug!(remote, ?local, "server sent no symref, using local remote HEAD");
    Ok(local)
}

/// Extract `main` from `ref: refs/heads/main\tHEAD`
fn parse_symref(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let (target, name) = line.strip_prefix("ref:")?.split_once('\t')?;
        if name.trim() != "HEAD" {
            return None;
        }
        target
            .trim()
            .strip_prefix("refs/heads/")
            .filter(|branch| !branch.is_empty())
            .map(str::to_string)
    })
}

/// Does `refs/heads/<branch>` exist on the remote?
///
/// `ls-remote --exit-code` exits 2 when nothing matched; any other failure is
/// a real error, not a "no".
fn branch_exists_on(vcs: &dyn Vcs, remote: &str, branch: &str) -> Result<bool> {
    let pattern = format!("refs/heads/{branch}");
    let output = vcs.git(&["ls-remote", "--exit-code", "--heads", remote, &pattern])?;
    match output.code {
        Some(0) => Ok(true),
        Some(2) => Ok(false),
        _ => Err(Error::infra(
            format!("ls-remote {remote}"),
            output.summary(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitOutput;
    use crate::sync::testing::FakeVcs;

    fn missing() -> GitOutput {
        GitOutput::failed(2, "")
    }

    fn no_symref() -> GitOutput {
        GitOutput::ok("1111111111111111111111111111111111111111\tHEAD\n")
    }

    #[test]
    fn test_parse_symref() {
        let out = "ref: refs/heads/trunk\tHEAD\n2222222222222222222222222222222222222222\tHEAD\n";
        assert_eq!(parse_symref(out).as_deref(), Some("trunk"));
        assert_eq!(parse_symref("ref: refs/heads/dev/next\tHEAD\n").as_deref(), Some("dev/next"));
        assert_eq!(parse_symref(""), None);
        assert_eq!(parse_symref("ref: refs/tags/v1\tHEAD\n"), None);
    }

    #[test]
    fn test_upstream_symbolic_head_wins() {
        let vcs = FakeVcs::new()
            .with_remote_head("upstream", "trunk")
            .with_remote_head("origin", "main");

        let branch = resolve(&vcs).unwrap();
        assert_eq!(branch.name, "trunk");
        assert_eq!(
            branch.source,
            BranchSource::SymbolicHead {
                remote: "upstream".into()
            }
        );
        assert_eq!(vcs.calls(), vec!["ls-remote --symref upstream HEAD"]);
    }

    #[test]
    fn test_server_head_beats_stale_local_ref() {
        let vcs = FakeVcs::new()
            .with_remote_head("upstream", "master")
            .respond(
                "ls-remote --symref upstream",
                GitOutput::ok("ref: refs/heads/main\tHEAD\nabc\tHEAD\n"),
            );

        assert_eq!(resolve(&vcs).unwrap().name, "main");
    }

    #[test]
    fn test_server_symref_beats_literal_main() {
        let vcs = FakeVcs::new()
            .respond(
                "ls-remote --symref upstream",
                GitOutput::ok("ref: refs/heads/trunk\tHEAD\nabc\tHEAD\n"),
            )
            .respond("ls-remote --exit-code --heads upstream refs/heads/main", GitOutput::ok("abc\trefs/heads/main\n"));

        let branch = resolve(&vcs).unwrap();
        assert_eq!(branch.name, "trunk");
        assert_eq!(branch.upstream_ref(), "upstream/trunk");
        assert!(vcs.calls_starting_with("ls-remote --exit-code").is_empty());
    }

    #[test]
    fn test_origin_head_before_name_probes() {
        let vcs = FakeVcs::new()
            .with_remote_head("origin", "develop")
            .respond("ls-remote --symref upstream", no_symref());

        let branch = resolve(&vcs).unwrap();
        assert_eq!(branch.name, "develop");
        assert_eq!(
            branch.source,
            BranchSource::SymbolicHead {
                remote: "origin".into()
            }
        );
    }

    #[test]
    fn test_probe_order_main_before_master() {
        let vcs = FakeVcs::new()
            .respond("ls-remote --symref", no_symref())
            .respond("ls-remote --exit-code --heads upstream refs/heads/main", missing())
            .respond("ls-remote --exit-code --heads origin refs/heads/main", missing())
            .respond("ls-remote --exit-code --heads upstream refs/heads/master", GitOutput::ok("abc\trefs/heads/master\n"));

        let branch = resolve(&vcs).unwrap();
        assert_eq!(branch.name, "master");
        assert_eq!(
            branch.source,
            BranchSource::NameProbe {
                remote: "upstream".into()
            }
        );
        assert_eq!(
            vcs.calls_starting_with("ls-remote --exit-code"),
            vec![
                "ls-remote --exit-code --heads upstream refs/heads/main",
                "ls-remote --exit-code --heads origin refs/heads/main",
                "ls-remote --exit-code --heads upstream refs/heads/master",
            ]
        );
    }

    #[test]
    fn test_main_on_origin_only() {
        let vcs = FakeVcs::new()
            .respond("ls-remote --symref", no_symref())
            .respond("ls-remote --exit-code --heads upstream", missing());

        let branch = resolve(&vcs).unwrap();
        assert_eq!(branch.name, "main");
        assert_eq!(
            branch.source,
            BranchSource::NameProbe {
                remote: "origin".into()
            }
        );
    }

    #[test]
    fn test_unresolvable() {
        let vcs = FakeVcs::new()
            .respond("ls-remote --symref", no_symref())
            .respond("ls-remote --exit-code", missing());

        assert!(matches!(
            resolve(&vcs),
            Err(Error::UnresolvableDefaultBranch)
        ));
    }

    #[test]
    fn test_symref_failure_does_not_fall_through_to_origin() {
        let vcs = FakeVcs::new()
            .with_remote_head("origin", "develop")
            .respond(
                "ls-remote --symref upstream",
                GitOutput::failed(128, "fatal: unable to access 'https://example.com/': Could not resolve host"),
            );

        let err = resolve(&vcs).unwrap_err();
        match err {
            Error::InfrastructureFailure { operation, message, .. } => {
                assert_eq!(operation, "ls-remote upstream");
                assert!(message.contains("Could not resolve host"));
            }
            other => panic!("expected InfrastructureFailure, got {other:?}"),
        }
        assert!(vcs.calls_starting_with("ls-remote --symref origin").is_empty());
    }

    #[test]
    fn test_probe_network_failure_is_not_absence() {
        let vcs = FakeVcs::new()
            .respond("ls-remote --symref", no_symref())
            .respond(
                "ls-remote --exit-code",
                GitOutput::failed(128, "fatal: unable to access 'https://example.com/'"),
            );

        assert!(matches!(
            resolve(&vcs),
            Err(Error::InfrastructureFailure { .. })
        ));
    }
}
