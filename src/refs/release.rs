//! Release representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::objects::{Oid, Signature};

/// A tag with release notes and the recorded database size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    commit: Oid,
    date: DateTime<Utc>,
    #[serde(default)]
    description: String,
    releaser: Signature,
    /// Size in bytes of the database at `commit`.
    size: u64,
}

impl Release {
    /// Creates a new Release.
    pub fn new(
        commit: Oid,
        date: DateTime<Utc>,
        description: impl Into<String>,
        releaser: Signature,
        size: u64,
    ) -> Self {
        Release {
            commit,
            date,
            description: description.into(),
            releaser,
            size,
        }
    }

    /// Returns the target commit ID.
    pub fn commit(&self) -> &Oid {
        &self.commit
    }

    /// Returns the release date.
    pub fn date(&self) -> &DateTime<Utc> {
        &self.date
    }

    /// Returns the release notes.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns who made the release.
    pub fn releaser(&self) -> &Signature {
        &self.releaser
    }

    /// Returns the database size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns a copy with new release notes; commit, releaser and size are kept.
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Release {
            description: description.into(),
            ..self.clone()
        }
    }
}
