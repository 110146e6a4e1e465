//! Git backend for forksync
//!
//! The sync pipeline never assumes "the repository" is the process's current
//! directory. It is handed a [`Vcs`] implementation and talks to git only
//! through it.
//!
//! # Split of responsibilities
//!
//! 1. **Queries** (work tree, detached HEAD, dirtiness, shallowness, remotes,
//!    branch tracking) are answered in-process through `git2`.
//! 2. **Network and history operations** (fetch, ls-remote, checkout, merge,
//!    rebase, push) run the system `git` binary, so credential helpers, SSH
//!    config and hooks behave exactly as they do for the user.
//!
//! Subprocess results come back as a raw [`GitOutput`]; deciding whether a
//! non-zero exit was a conflict, a refused fast-forward or an infrastructure
//! problem is the caller's job (see [`conflict`]).

use git2::{BranchType, ErrorCode, Repository as Git2Repo, Status, StatusOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{Error, Result};

mod command;
pub mod conflict;

pub use command::GitOutput;

/// The version-control operations the sync pipeline depends on
pub trait Vcs {
    /// The path the handle was opened for
    fn path(&self) -> &Path;

    /// Is the handle inside a (non-bare) working tree?
    fn is_work_tree(&self) -> Result<bool>;

    /// Is HEAD pointing at a commit rather than a branch?
    fn is_head_detached(&self) -> Result<bool>;

    /// Tracked files modified in the work tree or staged in the index.
    ///
    /// Untracked files do not count.
    fn has_uncommitted_changes(&self) -> Result<bool>;

    fn is_shallow(&self) -> Result<bool>;

    /// URL of a configured remote, `None` if the remote does not exist
    fn remote_url(&self, name: &str) -> Result<Option<String>>;

    fn add_remote(&self, name: &str, url: &str) -> Result<()>;

    /// Target of `refs/remotes/<remote>/HEAD` as a short branch name
    fn remote_head(&self, remote: &str) -> Result<Option<String>>;

    /// Does `refs/remotes/<remote>/<branch>` exist locally?
    fn remote_tracking_ref_exists(&self, remote: &str, branch: &str) -> Result<bool>;

    fn local_branch_exists(&self, branch: &str) -> Result<bool>;

    /// Configured upstream of a local branch, e.g. `origin/main`
    fn branch_upstream(&self, branch: &str) -> Result<Option<String>>;

    /// Object id of HEAD, `None` on an unborn branch
    fn head_oid(&self) -> Result<Option<String>>;

    /// Paths with unresolved conflicts in the index
    fn conflicted_paths(&self) -> Result<Vec<String>>;

    /// Run `git <args>` in the work tree
    ///
    /// Returns `Err` only when git could not be run at all.
    fn git(&self, args: &[&str]) -> Result<GitOutput>;
}

/// A handle on the local clone of the fork
pub struct Repository {
    path: PathBuf,
    inner: Option<Git2Repo>,
}

impl Repository {
    /// Discover the repository containing `path`
    ///
    /// Never fails: a path outside any repository yields a handle whose
    /// [`Vcs::is_work_tree`] is false, so the probe can report it.
    pub fn discover(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let inner = match Git2Repo::discover(&path) {
            Ok(repo) => Some(repo),
            Err(err) => {
                debug!(path = %path.display(), error = %err.message(), "no repository found");
                None
            }
        };
        Self { path, inner }
    }

    /// The directory git subprocesses run in
    pub fn workdir(&self) -> &Path {
        self.inner
            .as_ref()
            .and_then(|repo| repo.workdir())
            .unwrap_or(self.path.as_path())
    }

    fn repo(&self) -> Result<&Git2Repo> {
        self.inner.as_ref().ok_or_else(|| Error::NotARepository {
            path: self.path.clone(),
        })
    }

    /// Get the underlying git2 repository (for advanced operations)
    pub fn inner(&self) -> Option<&Git2Repo> {
        self.inner.as_ref()
    }
}

impl Vcs for Repository {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_work_tree(&self) -> Result<bool> {
        Ok(self.inner.as_ref().is_some_and(|repo| !repo.is_bare()))
    }

    fn is_head_detached(&self) -> Result<bool> {
        Ok(self.repo()?.head_detached()?)
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);

        let dirty = Status::INDEX_NEW
            | Status::INDEX_MODIFIED
            | Status::INDEX_DELETED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE
            | Status::WT_MODIFIED
            | Status::WT_DELETED
            | Status::WT_RENAMED
            | Status::WT_TYPECHANGE
            | Status::CONFLICTED;

        let statuses = self.repo()?.statuses(Some(&mut opts))?;
        Ok(statuses.iter().any(|entry| entry.status().intersects(dirty)))
    }

    fn is_shallow(&self) -> Result<bool> {
        Ok(self.repo()?.is_shallow())
    }

    fn remote_url(&self, name: &str) -> Result<Option<String>> {
        match self.repo()?.find_remote(name) {
            Ok(remote) => Ok(Some(remote.url().unwrap_or_default().to_string())),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) if err.code() == ErrorCode::InvalidSpec => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.repo()?.remote(name, url)?;
        Ok(())
    }

    fn remote_head(&self, remote: &str) -> Result<Option<String>> {
        let name = format!("refs/remotes/{remote}/HEAD");
        let reference = match self.repo()?.find_reference(&name) {
            Ok(reference) => reference,
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let prefix = format!("refs/remotes/{remote}/");
        Ok(reference
            .symbolic_target()
            .and_then(|target| target.strip_prefix(&prefix))
            .filter(|branch| !branch.is_empty())
            .map(str::to_string))
    }

    fn remote_tracking_ref_exists(&self, remote: &str, branch: &str) -> Result<bool> {
        let name = format!("refs/remotes/{remote}/{branch}");
        match self.repo()?.find_reference(&name) {
            Ok(_) => Ok(true),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn local_branch_exists(&self, branch: &str) -> Result<bool> {
        match self.repo()?.find_branch(branch, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn branch_upstream(&self, branch: &str) -> Result<Option<String>> {
        let local = match self.repo()?.find_branch(branch, BranchType::Local) {
            Ok(local) => local,
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match local.upstream() {
            Ok(upstream) => Ok(upstream.name()?.map(str::to_string)),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn head_oid(&self) -> Result<Option<String>> {
        match self.repo()?.head() {
            Ok(head) => Ok(head.target().map(|oid| oid.to_string())),
            Err(err) if err.code() == ErrorCode::UnbornBranch => Ok(None),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn conflicted_paths(&self) -> Result<Vec<String>> {
        let mut index = self.repo()?.index()?;
        index.read(false)?;
        if !index.has_conflicts() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
            if let Some(entry) = entry {
                paths.push(String::from_utf8_lossy(&entry.path).into_owned());
            }
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn git(&self, args: &[&str]) -> Result<GitOutput> {
        command::run(self.workdir(), args)
    }
}
