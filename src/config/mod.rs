//! Engine configuration.
//!
//! Every key is optional; missing keys take their defaults.
//!
//! # Example
//!
//! ```
//! use dbgraph::config::{EngineConfig, MergeStrategy};
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     default_branch = "main"
//!     merge_strategy = "merge-commit"
//!
//!     [store]
//!     root = "/var/lib/dbgraph"
//!     compression_level = 9
//! "#).unwrap();
//!
//! assert_eq!(config.default_branch, "main");
//! assert_eq!(config.merge_strategy, MergeStrategy::MergeCommit);
//! assert_eq!(config.max_history_depth, 1_000_000);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::infra::read_file;
use crate::refs::validate_ref_name;

/// How a merge moves the destination branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Copy the source commits and move the head to the newest one.
    #[default]
    FastForward,
    /// Record one new commit holding the source's newest tree.
    MergeCommit,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::FastForward => f.write_str("fast-forward"),
            MergeStrategy::MergeCommit => f.write_str("merge-commit"),
        }
    }
}

/// Settings of the file-backed document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory holding one directory per repository.
    pub root: PathBuf,
    /// Zlib level (0..=10) for stored documents.
    pub compression_level: u8,
}

impl StoreConfig {
    /// Default zlib level.
    pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            root: PathBuf::from("data"),
            compression_level: Self::DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Settings of the commit-graph engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Branch created by the first upload of a repository.
    pub default_branch: String,
    /// Maximum number of commits an ancestry walk visits.
    pub max_history_depth: usize,
    /// How merges move the destination branch.
    pub merge_strategy: MergeStrategy,
    /// File store settings.
    pub store: StoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_branch: "master".to_string(),
            max_history_depth: 1_000_000,
            merge_strategy: MergeStrategy::default(),
            store: StoreConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(text).map_err(|e| Error::InvalidConfig(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = read_file(path)?.ok_or_else(|| {
            Error::InvalidConfig(format!("config file not found: {}", path.display()))
        })?;
        let text = String::from_utf8(bytes).map_err(|_| {
            Error::InvalidConfig(format!("config file is not UTF-8: {}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        validate_ref_name(&self.default_branch)
            .map_err(|e| Error::InvalidConfig(format!("default_branch: {}", e)))?;
        if self.max_history_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_history_depth must be at least 1".to_string(),
            ));
        }
        if self.store.compression_level > 10 {
            return Err(Error::InvalidConfig(format!(
                "store.compression_level must be 0..=10, got {}",
                self.store.compression_level
            )));
        }
        Ok(())
    }
}
