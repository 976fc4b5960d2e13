//! Error types for dbgraph.

use std::path::PathBuf;

use crate::objects::Oid;
use crate::store::{DocumentKind, RepoId};

/// The kind of reference a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// A branch.
    Branch,
    /// A tag.
    Tag,
    /// A release.
    Release,
}

impl RefKind {
    /// Returns the lowercase name used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            RefKind::Branch => "branch",
            RefKind::Tag => "tag",
            RefKind::Release => "release",
        }
    }
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of an [`Error`].
///
/// Validation kinds are expected outcomes a caller translates into a
/// user-facing response. `BrokenHistory` and `Storage` are faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A repository or named reference is absent.
    NotFound,
    /// Name collision, default-branch deletion or concurrent modification.
    Conflict,
    /// A supplied commit ID does not exist.
    InvalidReference,
    /// Removing history would orphan tags or releases.
    IsolationConflict,
    /// The request itself is malformed or cannot be acted on.
    BadRequest,
    /// The parent chain of a commit is corrupt.
    BrokenHistory,
    /// The underlying persistence failed.
    Storage,
}

impl ErrorKind {
    /// Returns `true` for kinds that are normal, user-facing outcomes.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, ErrorKind::BrokenHistory | ErrorKind::Storage)
    }
}

/// Failures raised by a [`DocumentStore`](crate::store::DocumentStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be encoded or decoded.
    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Zlib decompression failed.
    #[error("zlib decompression failed: {}", .path.display())]
    DecompressionFailed {
        /// The file that failed to decompress.
        path: PathBuf,
    },

    /// A stored document is malformed.
    #[error("corrupt document {}: {reason}", .path.display())]
    Corrupt {
        /// The file holding the document.
        path: PathBuf,
        /// The reason it was rejected.
        reason: String,
    },
}

/// The main error type for dbgraph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The repository does not exist.
    #[error("repository not found: {0}")]
    RepositoryNotFound(RepoId),

    /// The repository already exists.
    #[error("repository already exists: {0}")]
    RepositoryExists(RepoId),

    /// The named branch, tag or release does not exist.
    #[error("{kind} not found: {name}")]
    RefNotFound {
        /// What kind of reference was looked up.
        kind: RefKind,
        /// The missing name.
        name: String,
    },

    /// A branch, tag or release of that name already exists.
    #[error("a {kind} of that name already exists: {name}")]
    RefAlreadyExists {
        /// The kind of reference.
        kind: RefKind,
        /// The conflicting name.
        name: String,
    },

    /// The provided string is not a valid reference name.
    #[error("invalid reference name: {0}")]
    InvalidRefName(String),

    /// The provided string is not a valid object ID.
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    /// Cannot delete the default branch.
    #[error("cannot delete the default branch: {0}")]
    CannotDeleteDefaultBranch(String),

    /// A commit or blob ID that does not exist.
    #[error("object not found: {0}")]
    InvalidReference(Oid),

    /// The name is not a branch of the repository.
    #[error("not a branch of this repository: {0}")]
    InvalidBranch(String),

    /// The commit is not part of the named branch's history.
    #[error("commit {commit} is not in the history of branch '{branch}'")]
    NotInBranchHistory {
        /// The branch.
        branch: String,
        /// The commit that was looked for.
        commit: Oid,
    },

    /// Removing history would leave tags or releases unreachable.
    #[error("{}", isolation_message(.tags, .releases))]
    IsolationConflict {
        /// Tags that would become isolated.
        tags: Vec<String>,
        /// Releases that would become isolated.
        releases: Vec<String>,
    },

    /// A parent link points at a commit missing from the commit map.
    #[error("broken commit history in {repo}: commit {commit} references missing parent {missing}")]
    BrokenHistory {
        /// The repository being walked.
        repo: RepoId,
        /// The commit whose parent is missing.
        commit: Oid,
        /// The missing parent ID.
        missing: Oid,
    },

    /// The history walk exceeded the configured depth.
    #[error("history of {start} in {repo} exceeds {limit} commits (cyclic or corrupt chain?)")]
    HistoryTooDeep {
        /// The repository being walked.
        repo: RepoId,
        /// The commit the walk started from.
        start: Oid,
        /// The configured limit.
        limit: usize,
    },

    /// A stored document changed since it was read.
    #[error("{kind} of {repo} changed concurrently (expected version {expected}, found {actual})")]
    ConcurrentModification {
        /// The repository.
        repo: RepoId,
        /// The document that was being written.
        kind: DocumentKind,
        /// The version the writer read.
        expected: u64,
        /// The version currently stored.
        actual: u64,
    },

    /// A branch head differs from the one the caller last saw.
    #[error("branch '{branch}' changed concurrently (expected head {expected}, found {actual})")]
    BranchMoved {
        /// The branch.
        branch: String,
        /// The head the caller expected.
        expected: Oid,
        /// The current head.
        actual: Oid,
    },

    /// A branch named in a merge request does not exist.
    #[error("branch '{branch}' does not exist in {repo}")]
    MergeBranchNotFound {
        /// The repository that was searched.
        repo: RepoId,
        /// The missing branch.
        branch: String,
    },

    /// Source and destination heads are identical.
    #[error("source and destination commits are identical, no merge needs doing")]
    NothingToMerge,

    /// The source branch is not a clean descendant of the destination.
    #[error("branch '{source_branch}' cannot be merged cleanly into '{destination_branch}'")]
    NotMergeable {
        /// The source branch.
        source_branch: String,
        /// The destination branch.
        destination_branch: String,
    },

    /// The head commit of a branch cannot be removed because it is the root.
    #[error("cannot remove the only commit of branch '{0}'")]
    CannotRemoveRootCommit(String),

    /// The commit has no database entry in its tree.
    #[error("commit {0} has no database entry")]
    EmptyTree(Oid),

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The document store failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RepositoryNotFound(_) | Error::RefNotFound { .. } => ErrorKind::NotFound,
            Error::RepositoryExists(_)
            | Error::RefAlreadyExists { .. }
            | Error::CannotDeleteDefaultBranch(_)
            | Error::ConcurrentModification { .. }
            | Error::BranchMoved { .. }
            | Error::CannotRemoveRootCommit(_) => ErrorKind::Conflict,
            Error::InvalidReference(_)
            | Error::InvalidBranch(_)
            | Error::NotInBranchHistory { .. } => ErrorKind::InvalidReference,
            Error::IsolationConflict { .. } => ErrorKind::IsolationConflict,
            Error::InvalidRefName(_)
            | Error::InvalidOid(_)
            | Error::MergeBranchNotFound { .. }
            | Error::NothingToMerge
            | Error::NotMergeable { .. }
            | Error::InvalidConfig(_) => ErrorKind::BadRequest,
            Error::BrokenHistory { .. } | Error::HistoryTooDeep { .. } | Error::EmptyTree(_) => {
                ErrorKind::BrokenHistory
            }
            Error::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn not_found(kind: RefKind, name: &str) -> Self {
        Error::RefNotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn exists(kind: RefKind, name: &str) -> Self {
        Error::RefAlreadyExists {
            kind,
            name: name.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(StorageError::Io(e))
    }
}

/// Builds the message listing would-be-isolated tags and releases.
fn isolation_message(tags: &[String], releases: &[String]) -> String {
    let mut parts = Vec::new();
    if !tags.is_empty() {
        let noun = if tags.len() == 1 { "tag" } else { "tags" };
        parts.push(format!("{} {}", noun, quoted_list(tags)));
    }
    if !releases.is_empty() {
        let noun = if releases.len() == 1 {
            "release"
        } else {
            "releases"
        };
        parts.push(format!("{} {}", noun, quoted_list(releases)));
    }
    let total = tags.len() + releases.len();
    let pronoun = if total == 1 { "it" } else { "them" };
    format!(
        "the {} would be left unreachable; delete {} first",
        parts.join(" and "),
        pronoun
    )
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for dbgraph operations.
pub type Result<T> = std::result::Result<T, Error>;
