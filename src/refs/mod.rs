//! Named references: branches, tags and releases.

pub mod branch;
pub mod release;
pub mod tag;

use std::collections::BTreeMap;

pub use branch::Branch;
pub use release::Release;
pub use tag::Tag;

use crate::error::{Error, Result};

/// Branch name to branch entry.
pub type BranchMap = BTreeMap<String, Branch>;

/// Tag name to tag entry.
pub type TagMap = BTreeMap<String, Tag>;

/// Release name to release entry.
pub type ReleaseMap = BTreeMap<String, Release>;

/// Validates a branch, tag or release name.
///
/// A valid name:
/// - Cannot be empty
/// - Cannot start or end with `/`
/// - Cannot contain `..`, `~`, `^`, `:`, `?`, `*`, `[`, `\`, or control characters
/// - Cannot start with `-`
/// - Cannot end with `.lock`
pub fn validate_ref_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidRefName("name cannot be empty".to_string()));
    }

    if name.starts_with('-') {
        return Err(Error::InvalidRefName(format!(
            "name cannot start with '-': {}",
            name
        )));
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err(Error::InvalidRefName(format!(
            "name cannot start or end with '/': {}",
            name
        )));
    }

    if name.ends_with(".lock") {
        return Err(Error::InvalidRefName(format!(
            "name cannot end with '.lock': {}",
            name
        )));
    }

    let invalid_chars = ['~', '^', ':', '?', '*', '[', '\\'];
    for c in invalid_chars {
        if name.contains(c) {
            return Err(Error::InvalidRefName(format!(
                "name contains invalid character '{}': {}",
                c, name
            )));
        }
    }

    if name.contains("..") {
        return Err(Error::InvalidRefName(format!(
            "name cannot contain '..': {}",
            name
        )));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(Error::InvalidRefName(format!(
            "name cannot contain control characters: {}",
            name
        )));
    }

    Ok(())
}
