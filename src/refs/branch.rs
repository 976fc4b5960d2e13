//! Branch representation.

use serde::{Deserialize, Serialize};

use crate::objects::Oid;

/// A mutable named pointer to the head commit of a linear history.
///
/// The branch name is the key in the repository's [`BranchMap`](super::BranchMap);
/// whether a branch is the default is stored separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// The head commit.
    commit: Oid,
    /// Cached length of the history ending at `commit`.
    commit_count: usize,
    /// Optional markdown description.
    #[serde(default)]
    description: String,
}

impl Branch {
    /// Creates a new Branch.
    pub fn new(commit: Oid, commit_count: usize, description: impl Into<String>) -> Self {
        Branch {
            commit,
            commit_count,
            description: description.into(),
        }
    }

    /// Returns the head commit ID.
    pub fn commit(&self) -> &Oid {
        &self.commit
    }

    /// Returns the number of commits in the branch history.
    pub fn commit_count(&self) -> usize {
        self.commit_count
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns a short representation of the head commit.
    pub fn short_oid(&self) -> String {
        self.commit.short()
    }

    /// Moves the head, keeping the description.
    pub fn with_head(&self, commit: Oid, commit_count: usize) -> Self {
        Branch {
            commit,
            commit_count,
            description: self.description.clone(),
        }
    }

    /// Replaces the description.
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Branch {
            description: description.into(),
            ..self.clone()
        }
    }
}
