//! Content-addressed object types (commit, tree).

pub mod commit;
pub mod oid;
pub mod tree;

use std::collections::BTreeMap;

pub use commit::{Commit, CommitBuilder, Signature};
pub use oid::Oid;
pub use tree::{EntryType, Tree, TreeEntry};

/// Every commit of one repository, keyed by commit ID.
///
/// Stored and replaced as a whole document.
pub type CommitMap = BTreeMap<Oid, Commit>;

/// Inserts a commit into a map keyed by its own ID.
pub fn insert_commit(commits: &mut CommitMap, commit: Commit) -> Oid {
    let id = *commit.id();
    commits.insert(id, commit);
    id
}
