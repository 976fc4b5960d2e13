//! Whole-document persistence of commit and reference maps.
//!
//! Every repository owns five documents (see [`DocumentKind`]). They are
//! always read and replaced as a whole. Each write names the version it was
//! computed from and is rejected if another writer got there first, so a
//! read-modify-write cycle can never silently discard a concurrent change.

pub mod file;
pub mod memory;
pub mod services;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use crate::error::{Error, Result, StorageError};
use crate::objects::CommitMap;
use crate::refs::{BranchMap, ReleaseMap, TagMap};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use services::{BlobStore, CacheInvalidator, CacheKey, LicenceDirectory, NoopCache};

/// Identifies a hosted database: owner, folder and file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId {
    owner: String,
    folder: String,
    name: String,
}

impl RepoId {
    /// Creates an ID in the owner's root folder (`/`).
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        RepoId::with_folder(owner, "/", name)
    }

    /// Creates an ID in a specific folder.
    pub fn with_folder(
        owner: impl Into<String>,
        folder: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        RepoId {
            owner: owner.into(),
            folder: folder.into(),
            name: name.into(),
        }
    }

    /// Returns the owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the folder.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Returns the database name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let folder = self.folder.trim_matches('/');
        if folder.is_empty() {
            write!(f, "{}/{}", self.owner, self.name)
        } else {
            write!(f, "{}/{}/{}", self.owner, folder, self.name)
        }
    }
}

/// The documents stored per repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    /// Commit ID to commit.
    Commits,
    /// Branch name to branch entry.
    Branches,
    /// Tag name to tag entry.
    Tags,
    /// Release name to release entry.
    Releases,
    /// The default branch name.
    DefaultBranch,
}

impl DocumentKind {
    /// All document kinds.
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Commits,
        DocumentKind::Branches,
        DocumentKind::Tags,
        DocumentKind::Releases,
        DocumentKind::DefaultBranch,
    ];

    /// Returns the document name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Commits => "commits",
            DocumentKind::Branches => "branches",
            DocumentKind::Tags => "tags",
            DocumentKind::Releases => "releases",
            DocumentKind::DefaultBranch => "default_branch",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document as raw bytes plus its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Serialized document.
    pub data: Vec<u8>,
    /// Version of this document, starting at 1 for the first write.
    pub version: u64,
}

/// A decoded document and the version it was read at.
///
/// Version 0 means the document has never been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// The decoded document.
    pub value: T,
    /// The version to pass back when writing a modified copy.
    pub version: u64,
}

/// Persistent key-value document storage, keyed by repository and kind.
///
/// Implementations must make `write` a compare-and-swap on the version.
pub trait DocumentStore: Send + Sync {
    /// Returns `true` if the repository has been created.
    fn repository_exists(&self, repo: &RepoId) -> Result<bool>;

    /// Creates an empty repository.
    ///
    /// Fails with `Error::RepositoryExists` if it already exists.
    fn create_repository(&self, repo: &RepoId) -> Result<()>;

    /// Reads a document. `Ok(None)` if it has never been written.
    ///
    /// Fails with `Error::RepositoryNotFound` for an unknown repository.
    fn read(&self, repo: &RepoId, kind: DocumentKind) -> Result<Option<RawDocument>>;

    /// Replaces a document if its stored version equals `expected`.
    ///
    /// Returns the new version. Fails with `Error::ConcurrentModification`
    /// when the stored version differs.
    fn write(&self, repo: &RepoId, kind: DocumentKind, data: Vec<u8>, expected: u64)
        -> Result<u64>;
}

/// Typed, serde-backed access to one repository's documents.
pub struct Documents<'a> {
    store: &'a dyn DocumentStore,
    repo: &'a RepoId,
}

impl<'a> Documents<'a> {
    /// Wraps a store for one repository.
    pub fn new(store: &'a dyn DocumentStore, repo: &'a RepoId) -> Self {
        Documents { store, repo }
    }

    /// Returns the repository these documents belong to.
    pub fn repo(&self) -> &RepoId {
        self.repo
    }

    fn load<T: DeserializeOwned + Default>(&self, kind: DocumentKind) -> Result<Versioned<T>> {
        match self.store.read(self.repo, kind)? {
            None => Ok(Versioned {
                value: T::default(),
                version: 0,
            }),
            Some(raw) => {
                let value = serde_json::from_slice(&raw.data).map_err(|e| {
                    error!(repo = %self.repo, document = %kind, error = %e, "stored document does not decode");
                    Error::Storage(StorageError::Encoding(e))
                })?;
                Ok(Versioned {
                    value,
                    version: raw.version,
                })
            }
        }
    }

    fn save<T: Serialize>(&self, kind: DocumentKind, value: &T, expected: u64) -> Result<u64> {
        let data = serde_json::to_vec(value).map_err(|e| {
            error!(repo = %self.repo, document = %kind, error = %e, "document does not encode");
            Error::Storage(StorageError::Encoding(e))
        })?;
        self.store.write(self.repo, kind, data, expected)
    }

    /// Reads the commit map.
    pub fn commits(&self) -> Result<Versioned<CommitMap>> {
        self.load(DocumentKind::Commits)
    }

    /// Replaces the commit map.
    pub fn put_commits(&self, commits: &CommitMap, expected: u64) -> Result<u64> {
        self.save(DocumentKind::Commits, commits, expected)
    }

    /// Reads the branch map.
    pub fn branches(&self) -> Result<Versioned<BranchMap>> {
        self.load(DocumentKind::Branches)
    }

    /// Replaces the branch map.
    pub fn put_branches(&self, branches: &BranchMap, expected: u64) -> Result<u64> {
        self.save(DocumentKind::Branches, branches, expected)
    }

    /// Reads the tag map.
    pub fn tags(&self) -> Result<Versioned<TagMap>> {
        self.load(DocumentKind::Tags)
    }

    /// Replaces the tag map.
    pub fn put_tags(&self, tags: &TagMap, expected: u64) -> Result<u64> {
        self.save(DocumentKind::Tags, tags, expected)
    }

    /// Reads the release map.
    pub fn releases(&self) -> Result<Versioned<ReleaseMap>> {
        self.load(DocumentKind::Releases)
    }

    /// Replaces the release map.
    pub fn put_releases(&self, releases: &ReleaseMap, expected: u64) -> Result<u64> {
        self.save(DocumentKind::Releases, releases, expected)
    }

    /// Reads the default branch name (empty if never set).
    pub fn default_branch(&self) -> Result<Versioned<String>> {
        self.load(DocumentKind::DefaultBranch)
    }

    /// Replaces the default branch name.
    pub fn put_default_branch(&self, name: &str, expected: u64) -> Result<u64> {
        self.save(DocumentKind::DefaultBranch, &name, expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_id_display() {
        assert_eq!(RepoId::new("alice", "books.sqlite").to_string(), "alice/books.sqlite");
        assert_eq!(
            RepoId::with_folder("alice", "/work/", "books.sqlite").to_string(),
            "alice/work/books.sqlite"
        );
    }

    #[test]
    fn test_documents_default_when_unwritten() {
        let store = MemoryStore::new();
        let repo = RepoId::new("alice", "a.sqlite");
        store.create_repository(&repo).unwrap();

        let docs = Documents::new(&store, &repo);
        let branches = docs.branches().unwrap();
        assert!(branches.value.is_empty());
        assert_eq!(branches.version, 0);
        assert_eq!(docs.default_branch().unwrap().value, "");
    }

    #[test]
    fn test_documents_roundtrip_and_version() {
        let store = MemoryStore::new();
        let repo = RepoId::new("alice", "a.sqlite");
        store.create_repository(&repo).unwrap();
        let docs = Documents::new(&store, &repo);

        let v1 = docs.put_default_branch("main", 0).unwrap();
        assert_eq!(v1, 1);
        let read = docs.default_branch().unwrap();
        assert_eq!(read.value, "main");
        assert_eq!(read.version, 1);

        // stale writer is rejected
        let stale = docs.put_default_branch("dev", 0);
        assert!(matches!(stale, Err(Error::ConcurrentModification { .. })));
    }

    #[test]
    fn test_undecodable_document_is_storage_error() {
        let store = MemoryStore::new();
        let repo = RepoId::new("alice", "a.sqlite");
        store.create_repository(&repo).unwrap();
        store
            .write(&repo, DocumentKind::Branches, b"not json".to_vec(), 0)
            .unwrap();

        let err = Documents::new(&store, &repo).branches().unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Encoding(_))));
    }
}
