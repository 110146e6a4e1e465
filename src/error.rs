//! Error types for forksync
//!
//! Every failure the pipeline can stop on has its own variant so the CLI can
//! print a one-line cause plus the exact command that gets the user unstuck.

use std::path::PathBuf;
use thiserror::Error;

use crate::request::SyncMethod;

/// The main error type for forksync operations
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Repository / Remote Errors
    // ==========================================================================
    #[error("'{}' is not inside a git working tree", path.display())]
    NotARepository { path: PathBuf },

    #[error("No 'origin' remote is configured; cannot tell where the fork lives")]
    MissingOriginRemote,

    #[error("Could not determine the default branch from 'upstream' or 'origin'")]
    UnresolvableDefaultBranch,

    // ==========================================================================
    // Input Errors
    // ==========================================================================
    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidArgument {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Aborted: uncommitted changes present and continuing was declined")]
    UncommittedChangesDeclined,

    // ==========================================================================
    // Sync Errors
    // ==========================================================================
    #[error("Could not repair shallow history: {message}")]
    HistoryRepairFailed { message: String },

    #[error("{method} onto '{target}' stopped on conflicts{}", format_paths(paths))]
    SyncConflict {
        method: SyncMethod,
        target: String,
        paths: Vec<String>,
    },

    #[error("git {operation} failed: {message}")]
    InfrastructureFailure {
        operation: String,
        message: String,
        #[source]
        source: Option<git2::Error>,
    },

    #[error("Push of '{refspec}' to 'origin' failed: {message}")]
    PushFailed { refspec: String, message: String },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    #[error("Failed to read config '{}': {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config '{}': {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("Preset '{name}' is not defined in '{}'", path.display())]
    PresetNotFound { name: String, path: PathBuf },
}

/// Result type alias for forksync operations
pub type Result<T> = std::result::Result<T, Error>;

fn format_paths(paths: &[String]) -> String {
    if paths.is_empty() {
        String::new()
    } else {
        format!(" in {}", paths.join(", "))
    }
}

impl Error {
    /// Shorthand for an infrastructure failure without a git2 source
    pub fn infra(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InfrastructureFailure {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }
}

// =============================================================================
// Conversions from external error types
// =============================================================================

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::InfrastructureFailure {
            operation: "repository query".to_string(),
            message: err.message().to_string(),
            source: Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::infra("spawn", err.to_string())
    }
}

impl From<crate::validation::ValidationError> for Error {
    fn from(err: crate::validation::ValidationError) -> Self {
        use crate::validation::ValidationError;
        match err {
            ValidationError::Empty(name) => Error::InvalidArgument {
                name,
                value: String::new(),
                reason: "cannot be empty",
            },
            ValidationError::NotABool(name, value) => Error::InvalidArgument {
                name,
                value,
                reason: "expected 'true' or 'false'",
            },
            ValidationError::UnknownMethod(value) => Error::InvalidArgument {
                name: "--method",
                value,
                reason: "expected 'merge' or 'rebase'",
            },
            ValidationError::Missing(name) => Error::InvalidArgument {
                name,
                value: String::new(),
                reason: "required",
            },
            ValidationError::Whitespace(name, value) => Error::InvalidArgument {
                name,
                value,
                reason: "must not contain whitespace",
            },
        }
    }
}

// =============================================================================
// Error Display Helpers
// =============================================================================

impl Error {
    /// Returns the remedial command(s) for this error, if there is one
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::NotARepository { .. } => {
                Some("Run forksync from inside your fork's clone, or pass --repo <path>".into())
            }
            Error::MissingOriginRemote => Some("git remote add origin <your-fork-url>".into()),
            Error::UnresolvableDefaultBranch => {
                Some("git remote set-head upstream <branch>".into())
            }
            Error::InvalidArgument { .. } => Some("Run forksync --help for usage".into()),
            Error::UncommittedChangesDeclined => {
                Some("git stash   (or commit your changes, then re-run)".into())
            }
            Error::SyncConflict { method, .. } => Some(match method {
                SyncMethod::Merge => {
                    "Resolve the conflicts and run `git merge --continue`, or undo with `git merge --abort`"
                        .into()
                }
                SyncMethod::Rebase => {
                    "Resolve the conflicts and run `git rebase --continue`, or undo with `git rebase --abort`"
                        .into()
                }
            }),
            Error::PushFailed { refspec, .. } => Some(format!(
                "Local branch is synced; push it yourself with `git push origin {refspec}`"
            )),
            Error::PresetNotFound { .. } => Some("Check the presets section of the config".into()),
            _ => None,
        }
    }

    /// Process exit code for this error
    ///
    /// All failures share one code.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotARepository { .. } => "not_a_repository",
            Error::MissingOriginRemote => "missing_origin_remote",
            Error::UnresolvableDefaultBranch => "unresolvable_default_branch",
            Error::InvalidArgument { .. } => "invalid_argument",
            Error::UncommittedChangesDeclined => "uncommitted_changes_declined",
            Error::HistoryRepairFailed { .. } => "history_repair_failed",
            Error::SyncConflict { .. } => "sync_conflict",
            Error::InfrastructureFailure { .. } => "infrastructure_failure",
            Error::PushFailed { .. } => "push_failed",
            Error::ConfigRead { .. } => "config_read",
            Error::ConfigParse { .. } => "config_parse",
            Error::PresetNotFound { .. } => "preset_not_found",
        }
    }
}
