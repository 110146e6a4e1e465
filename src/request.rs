//! The validated input of one sync run

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validation::{self, ValidationError};

/// How upstream changes are integrated into the local default branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMethod {
    Merge,
    Rebase,
}

impl fmt::Display for SyncMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMethod::Merge => f.write_str("merge"),
            SyncMethod::Rebase => f.write_str("rebase"),
        }
    }
}

impl std::str::FromStr for SyncMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validation::parse_method(s)
    }
}

/// Immutable description of what a run should do
///
/// Built once per invocation through [`SyncRequestBuilder`]; all fields are
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncRequest {
    upstream_url: String,
    method: SyncMethod,
    push: bool,
    sync_tags: bool,
    fast_forward_only: bool,
}

impl SyncRequest {
    /// Start building a request
    pub fn builder() -> SyncRequestBuilder {
        SyncRequestBuilder::default()
    }

    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    pub fn method(&self) -> SyncMethod {
        self.method
    }

    pub fn push(&self) -> bool {
        self.push
    }

    pub fn sync_tags(&self) -> bool {
        self.sync_tags
    }

    /// Fast-forward-first policy; only ever true for [`SyncMethod::Merge`]
    pub fn fast_forward_only(&self) -> bool {
        self.fast_forward_only && self.method == SyncMethod::Merge
    }
}

/// Builder for [`SyncRequest`]
///
/// Unset optional fields fall back to their defaults; required ones produce
/// [`ValidationError::Missing`].
#[derive(Debug, Clone, Default)]
pub struct SyncRequestBuilder {
    upstream_url: Option<String>,
    method: Option<SyncMethod>,
    push: Option<bool>,
    sync_tags: Option<bool>,
    fast_forward_only: Option<bool>,
}

impl SyncRequestBuilder {
    pub fn upstream_url(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = Some(url.into());
        self
    }

    pub fn method(mut self, method: SyncMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn push(mut self, push: bool) -> Self {
        self.push = Some(push);
        self
    }

    pub fn sync_tags(mut self, sync_tags: bool) -> Self {
        self.sync_tags = Some(sync_tags);
        self
    }

    pub fn fast_forward_only(mut self, ff_only: bool) -> Self {
        self.fast_forward_only = Some(ff_only);
        self
    }

    /// Fill any field that is still unset from `other`
    pub fn or(self, other: SyncRequestBuilder) -> Self {
        Self {
            upstream_url: self.upstream_url.or(other.upstream_url),
            method: self.method.or(other.method),
            push: self.push.or(other.push),
            sync_tags: self.sync_tags.or(other.sync_tags),
            fast_forward_only: self.fast_forward_only.or(other.fast_forward_only),
        }
    }

    /// Validate and freeze the request
    pub fn build(self) -> Result<SyncRequest, ValidationError> {
        let upstream_url = self.upstream_url.ok_or(ValidationError::Missing("--upstream"))?;
        validation::validate_upstream_url(&upstream_url)?;
        let method = self.method.ok_or(ValidationError::Missing("--method"))?;
        let push = self.push.ok_or(ValidationError::Missing("--push"))?;

        Ok(SyncRequest {
            upstream_url: upstream_url.trim().to_string(),
            method,
            push,
            sync_tags: self.sync_tags.unwrap_or(false),
            fast_forward_only: self.fast_forward_only.unwrap_or(false),
        })
    }
}
