//! Input validation for forksync
//!
//! Command-line flags and preset values arrive as strings. Everything is
//! checked here, before the pipeline touches the repository.

use thiserror::Error;

use crate::request::SyncMethod;

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("{0} must be 'true' or 'false', got '{1}'")]
    NotABool(&'static str, String),

    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} must not contain whitespace: '{1}'")]
    Whitespace(&'static str, String),
}

/// Parse a strict boolean flag value
///
/// Only `true` and `false` are accepted (case-insensitive). `yes`, `1` and
/// friends are rejected so that a typo never flips a push on.
pub fn parse_bool_flag(name: &'static str, value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        "" => Err(ValidationError::Empty(name)),
        _ => Err(ValidationError::NotABool(name, value.to_string())),
    }
}

/// Parse the integration method
pub fn parse_method(value: &str) -> Result<SyncMethod, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "merge" => Ok(SyncMethod::Merge),
        "rebase" => Ok(SyncMethod::Rebase),
        "" => Err(ValidationError::Empty("--method")),
        _ => Err(ValidationError::UnknownMethod(value.to_string())),
    }
}

/// Validate an upstream repository URL
///
/// Git accepts many URL shapes (scp-like, file paths, https), so only the
/// obviously broken ones are rejected here.
pub fn validate_upstream_url(url: &str) -> Result<(), ValidationError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("--upstream"));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(ValidationError::Whitespace("--upstream", url.to_string()));
    }
    Ok(())
}
