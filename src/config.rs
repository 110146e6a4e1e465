//! Argument presets
//!
//! Forks that always sync against the same upstream keep the arguments in a
//! YAML file instead of a wrapper script:
//!
//! ```yaml
//! presets:
//!   mylib:
//!     upstream: https://example.com/org/mylib.git
//!     method: merge
//!     push: true
//!     ff_only: true
//! ```
//!
//! The file lives at `<repo>/.forksync.yaml` unless `--config` says otherwise.
//! Flags given on the command line override the preset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::request::SyncRequestBuilder;
use crate::validation;
use crate::{Error, Result};

/// Default config file name, looked up in the repository root
pub const CONFIG_FILE_NAME: &str = ".forksync.yaml";

/// Contents of a config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named argument presets
    #[serde(default)]
    pub presets: BTreeMap<String, Preset>,
    /// Where the config was loaded from
    #[serde(skip)]
    pub path: PathBuf,
}

/// One named set of sync arguments; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Preset {
    #[serde(default)]
    pub upstream: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub push: Option<bool>,
    #[serde(default)]
    pub tags: Option<bool>,
    #[serde(default)]
    pub ff_only: Option<bool>,
}

impl Config {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse config text; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(content).map_err(|err| Error::ConfigParse {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?
        };
        config.path = path.to_path_buf();
        Ok(config)
    }

    /// Look up a preset by name
    pub fn preset(&self, name: &str) -> Result<&Preset> {
        self.presets.get(name).ok_or_else(|| Error::PresetNotFound {
            name: name.to_string(),
            path: self.path.clone(),
        })
    }
}

impl Preset {
    /// Convert into a partially filled request builder
    pub fn to_builder(&self) -> Result<SyncRequestBuilder> {
        let mut builder = crate::SyncRequest::builder();
        if let Some(url) = &self.upstream {
            builder = builder.upstream_url(url.clone());
        }
        if let Some(method) = &self.method {
            builder = builder.method(validation::parse_method(method)?);
        }
        if let Some(push) = self.push {
            builder = builder.push(push);
        }
        if let Some(tags) = self.tags {
            builder = builder.sync_tags(tags);
        }
        if let Some(ff_only) = self.ff_only {
            builder = builder.fast_forward_only(ff_only);
        }
        Ok(builder)
    }
}
