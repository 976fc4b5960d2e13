//! Database tree implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::oid::Oid;
use crate::infra::hash;

/// The type of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// A nested tree.
    #[serde(rename = "tree")]
    Tree,
    /// A SQLite database file.
    #[serde(rename = "db")]
    Database,
    /// A licence text.
    #[serde(rename = "licence")]
    Licence,
}

impl EntryType {
    /// Returns the type name used in hashed content.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Tree => "tree",
            EntryType::Database => "db",
            EntryType::Licence => "licence",
        }
    }
}

/// An entry in a tree: one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    entry_type: EntryType,
    name: String,
    /// SHA-256 of the file bytes in the blob store.
    sha256: Oid,
    size: u64,
    last_modified: DateTime<Utc>,
    /// Content hash of the licence text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    licence: Option<Oid>,
}

impl TreeEntry {
    /// Creates a new tree entry.
    pub fn new(
        entry_type: EntryType,
        name: impl Into<String>,
        sha256: Oid,
        size: u64,
        last_modified: DateTime<Utc>,
        licence: Option<Oid>,
    ) -> Self {
        TreeEntry {
            entry_type,
            name: name.into(),
            sha256,
            size,
            last_modified,
            licence,
        }
    }

    /// Returns the entry type.
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Returns the file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the content hash of the file.
    pub fn sha256(&self) -> &Oid {
        &self.sha256
    }

    /// Returns the file size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the last-modified time of the file.
    pub fn last_modified(&self) -> &DateTime<Utc> {
        &self.last_modified
    }

    /// Returns the licence hash, if any.
    pub fn licence(&self) -> Option<&Oid> {
        self.licence.as_ref()
    }

    /// Returns a copy of this entry with a different licence.
    pub fn with_licence(&self, licence: Option<Oid>) -> Self {
        TreeEntry {
            licence,
            ..self.clone()
        }
    }
}

/// A content-addressed list of file entries recorded by a commit.
///
/// In practice every tree holds exactly one entry, the database file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    id: Oid,
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Creates a tree, computing its ID from the entries.
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        let id = hash::tree_id(&entries);
        Tree { id, entries }
    }

    /// Creates a tree holding a single entry.
    pub fn single(entry: TreeEntry) -> Self {
        Tree::new(vec![entry])
    }

    /// Returns the tree ID.
    pub fn id(&self) -> &Oid {
        &self.id
    }

    /// Returns all entries.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Returns the first database entry.
    pub fn database(&self) -> Option<&TreeEntry> {
        self.entries
            .iter()
            .find(|e| e.entry_type == EntryType::Database)
    }

    /// Returns `true` if the stored ID matches the entries.
    pub fn verify(&self) -> bool {
        hash::tree_id(&self.entries) == self.id
    }
}
