//! Ancestry walking over a commit map.
//!
//! Every branch is a linear chain of parent links ending at a root commit.
//! A [`Walker`] follows that chain from any start commit, newest first.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use dbgraph::log::Walker;
//! use dbgraph::objects::{insert_commit, Commit, CommitMap, EntryType, Tree, TreeEntry};
//! use dbgraph::store::RepoId;
//! use dbgraph::sha256;
//!
//! let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let tree = Tree::single(TreeEntry::new(EntryType::Database, "a.sqlite", sha256(b"a"), 1, at, None));
//! let mut commits = CommitMap::new();
//! let root = insert_commit(&mut commits, Commit::builder(tree.clone()).timestamp(at).build());
//! let head = insert_commit(&mut commits, Commit::builder(tree).parent(root).timestamp(at).build());
//!
//! let repo = RepoId::new("alice", "a.sqlite");
//! let walker = Walker::new(&repo, &commits, 100);
//! assert_eq!(walker.count(&head).unwrap(), 2);
//! assert!(walker.contains(&head, &root).unwrap());
//! ```

use std::collections::HashSet;

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::objects::{Commit, CommitMap, Oid};
use crate::store::RepoId;

/// Walks parent chains of one repository's commit map.
///
/// Walks are pure: nothing is consumed, so the same walker can be used for
/// any number of chains.
#[derive(Debug, Clone, Copy)]
pub struct Walker<'a> {
    repo: &'a RepoId,
    commits: &'a CommitMap,
    limit: usize,
}

impl<'a> Walker<'a> {
    /// Creates a walker visiting at most `limit` commits per chain.
    pub fn new(repo: &'a RepoId, commits: &'a CommitMap, limit: usize) -> Self {
        Walker {
            repo,
            commits,
            limit,
        }
    }

    /// Returns an iterator over the chain starting at `start`.
    pub fn history(&self, start: &Oid) -> History<'a> {
        History {
            repo: self.repo,
            commits: self.commits,
            limit: self.limit,
            start: *start,
            next: Some(*start),
            child: None,
            visited: 0,
            done: false,
        }
    }

    /// Collects the chain starting at `start`, newest first.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidReference` if `start` is not in the commit map
    /// - `Error::BrokenHistory` if a parent link points at a missing commit
    /// - `Error::HistoryTooDeep` if the chain exceeds the walk limit
    pub fn chain(&self, start: &Oid) -> Result<Vec<&'a Commit>> {
        let chain = self.history(start).collect::<Result<Vec<_>>>()?;
        debug!(repo = %self.repo, start = %start.short(), length = chain.len(), "walked history");
        Ok(chain)
    }

    /// Returns the IDs of every commit in the chain.
    pub fn commit_ids(&self, start: &Oid) -> Result<HashSet<Oid>> {
        self.history(start)
            .map(|c| c.map(|c| *c.id()))
            .collect()
    }

    /// Returns the length of the chain.
    pub fn count(&self, start: &Oid) -> Result<usize> {
        self.history(start).try_fold(0, |n, c| c.map(|_| n + 1))
    }

    /// Returns `true` if `target` lies in the chain starting at `start`.
    ///
    /// Stops at the first match.
    pub fn contains(&self, start: &Oid, target: &Oid) -> Result<bool> {
        for commit in self.history(start) {
            if commit?.id() == target {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Iterator over one parent chain, newest first.
///
/// Yields an error at most once and then stops.
#[derive(Debug, Clone)]
pub struct History<'a> {
    repo: &'a RepoId,
    commits: &'a CommitMap,
    limit: usize,
    start: Oid,
    next: Option<Oid>,
    /// The commit whose parent is `next`; `None` while at the start.
    child: Option<Oid>,
    visited: usize,
    done: bool,
}

impl<'a> History<'a> {
    fn fail(&mut self, err: Error) -> Option<Result<&'a Commit>> {
        self.done = true;
        self.next = None;
        Some(Err(err))
    }
}

impl<'a> Iterator for History<'a> {
    type Item = Result<&'a Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let id = self.next.take()?;

        if self.visited >= self.limit {
            let start = self.start;
            error!(repo = %self.repo, start = %start, limit = self.limit, "history walk exceeded limit");
            return self.fail(Error::HistoryTooDeep {
                repo: self.repo.clone(),
                start,
                limit: self.limit,
            });
        }

        let Some(commit) = self.commits.get(&id) else {
            let err = match self.child {
                Some(child) => {
                    error!(repo = %self.repo, commit = %child, missing = %id, "broken commit history");
                    Error::BrokenHistory {
                        repo: self.repo.clone(),
                        commit: child,
                        missing: id,
                    }
                }
                None => Error::InvalidReference(id),
            };
            return self.fail(err);
        };

        self.visited += 1;
        self.child = Some(id);
        self.next = commit.parent().copied();
        Some(Ok(commit))
    }
}
