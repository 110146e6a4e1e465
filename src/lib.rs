//! forksync - Fork Synchronization
//!
//! Brings a fork's local default branch up to date with the upstream
//! repository's default branch, by merge or rebase, and optionally pushes the
//! result back to the fork.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    forksync CLI (clap, presets)                 │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                │ SyncRequest + Confirm policy
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Sync Pipeline                            │
//! │  ┌─────────┐  ┌──────────┐  ┌─────────┐  ┌──────────────────┐   │
//! │  │  Probe  │─►│ Remotes  │─►│ History │─►│ Default Branch   │   │
//! │  │         │  │ Registry │  │ Repair  │  │ Resolver         │   │
//! │  └─────────┘  └──────────┘  └─────────┘  └────────┬─────────┘   │
//! │                                                   ▼             │
//! │                 ┌──────────────────┐    ┌──────────────────┐    │
//! │                 │ Push Coordinator │◄───│  Sync Executor   │    │
//! │                 └──────────────────┘    └──────────────────┘    │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                │ Vcs trait
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Git Backend                              │
//! │      git2 (queries, remotes)   │   git binary (fetch, merge,    │
//! │                                │   rebase, push, ls-remote)     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod confirm;
pub mod error;
pub mod git;
pub mod request;
pub mod sync;
pub mod validation;

pub use error::{Error, Result};

use std::path::Path;

pub use confirm::Confirm;
pub use git::{Repository, Vcs};
pub use request::{SyncMethod, SyncRequest};
pub use sync::{Pipeline, SyncOutcome, SyncReport};

/// Overall result of one invocation
pub type RunResult = Result<SyncReport>;

/// Synchronize the repository at `path`
pub fn run(path: impl AsRef<Path>, request: &SyncRequest, confirm: &mut dyn Confirm) -> RunResult {
    let repo = Repository::discover(path.as_ref());
    Pipeline::new(&repo, confirm).run(request)
}

/// Process exit code for a run result
pub fn exit_code(result: &RunResult) -> u8 {
    match result {
        Ok(_) => 0,
        Err(err) => err.exit_code(),
    }
}
