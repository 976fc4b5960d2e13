//! Cross-repository ancestor resolution and merging.
//!
//! Merging is two steps: [`common_ancestor`] works out what the destination
//! is missing, then [`merge`] applies it. The destination head seen by the
//! first step is re-checked by the second under the destination's lock.
//!
//! ```
//! use std::sync::Arc;
//! use dbgraph::merge::{common_ancestor, merge};
//! use dbgraph::{Actor, Engine, MemoryStore, RepoId, Upload};
//!
//! let engine = Engine::new(Arc::new(MemoryStore::new()));
//! let ann = Actor::new("ann", "Ann", "ann@example.org");
//! let repo = engine.init(RepoId::new("ann", "a.sqlite"), Upload::new("a.sqlite", b"1"), &ann).unwrap();
//! let root = *repo.branch("master").unwrap().commit();
//! repo.create_branch("dev", &root, "", &ann).unwrap();
//! repo.commit_upload("dev", Upload::new("a.sqlite", b"2"), &ann).unwrap();
//!
//! let ancestry = common_ancestor(&repo, "dev", &repo, "master").unwrap();
//! assert_eq!(ancestry.ancestor, Some(root));
//! let outcome = merge(&repo, "master", &repo, "dev", &ancestry, "Merge dev", &ann).unwrap();
//! assert_eq!(outcome.merged, 1);
//! ```

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::MergeStrategy;
use crate::error::{Error, Result};
use crate::objects::{insert_commit, Commit, Oid};
use crate::refs::Branch;
use crate::repository::{Actor, Repository};

/// What a destination branch lacks relative to a source branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorResult {
    /// The newest commit both branches share, if the source cleanly
    /// descends from the destination head. `None` means "cannot merge".
    pub ancestor: Option<Oid>,
    /// Source commits newer than the newest shared commit, oldest first.
    pub new_commits: Vec<Commit>,
    /// The source head at resolution time.
    pub source_head: Oid,
    /// The destination head at resolution time.
    pub destination_head: Oid,
}

impl AncestorResult {
    /// Returns `true` if the source can be merged cleanly.
    pub fn is_mergeable(&self) -> bool {
        self.ancestor.is_some()
    }
}

/// The result of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The new destination head.
    pub head: Oid,
    /// The strategy that was applied.
    pub strategy: MergeStrategy,
    /// The number of source commits brought in.
    pub merged: usize,
}

fn merge_branch(repo: &Repository<'_>, name: &str) -> Result<Branch> {
    repo.branches()?
        .remove(name)
        .ok_or_else(|| Error::MergeBranchNotFound {
            repo: repo.id().clone(),
            branch: name.to_string(),
        })
}

/// Finds the newest commit shared by two branches.
///
/// The destination chain is walked from its head; the first commit that is
/// also in the source chain is the shared one. The source is a clean
/// descendant only if that commit is the destination head itself, in which
/// case it is reported as `ancestor`.
///
/// # Errors
///
/// - `Error::MergeBranchNotFound` if either branch is missing.
/// - `Error::NothingToMerge` if both heads are the same commit.
/// - `Error::BrokenHistory` if either history is corrupt.
pub fn common_ancestor(
    source: &Repository<'_>,
    source_branch: &str,
    destination: &Repository<'_>,
    destination_branch: &str,
) -> Result<AncestorResult> {
    let src_head = *merge_branch(source, source_branch)?.commit();
    let dst_head = *merge_branch(destination, destination_branch)?.commit();
    if src_head == dst_head {
        return Err(Error::NothingToMerge);
    }

    let src_commits = source.commits()?;
    let dst_commits = destination.commits()?;
    let src_chain = source.walker(&src_commits).chain(&src_head)?;
    let src_ids: HashSet<Oid> = src_chain.iter().map(|c| *c.id()).collect();

    let mut shared = None;
    for commit in destination.walker(&dst_commits).history(&dst_head) {
        let id = *commit?.id();
        if src_ids.contains(&id) {
            shared = Some(id);
            break;
        }
    }

    let mut new_commits: Vec<Commit> = src_chain
        .iter()
        .take_while(|c| Some(*c.id()) != shared)
        .map(|c| (*c).clone())
        .collect();
    new_commits.reverse();

    let ancestor = shared.filter(|id| *id == dst_head);
    debug!(
        source = %source.id(),
        destination = %destination.id(),
        shared = ?shared.map(|id| id.short()),
        mergeable = ancestor.is_some(),
        new_commits = new_commits.len(),
        "resolved common ancestor"
    );

    Ok(AncestorResult {
        ancestor,
        new_commits,
        source_head: src_head,
        destination_head: dst_head,
    })
}

/// Merges using the destination engine's configured strategy.
///
/// `ancestry` must come from [`common_ancestor`] for the same branches.
pub fn merge(
    destination: &Repository<'_>,
    destination_branch: &str,
    source: &Repository<'_>,
    source_branch: &str,
    ancestry: &AncestorResult,
    message: &str,
    actor: &Actor,
) -> Result<MergeOutcome> {
    let strategy = destination.engine().config().merge_strategy;
    merge_with_strategy(
        destination,
        destination_branch,
        source,
        source_branch,
        ancestry,
        message,
        actor,
        strategy,
    )
}

/// Merges with an explicit strategy.
///
/// # Errors
///
/// - `Error::NotMergeable` if `ancestry` has no ancestor.
/// - `Error::NothingToMerge` if there are no new commits.
/// - `Error::MergeBranchNotFound` if the destination branch is gone.
/// - `Error::BranchMoved` if the destination head changed since `ancestry`
///   was computed.
#[allow(clippy::too_many_arguments)]
pub fn merge_with_strategy(
    destination: &Repository<'_>,
    destination_branch: &str,
    source: &Repository<'_>,
    source_branch: &str,
    ancestry: &AncestorResult,
    message: &str,
    actor: &Actor,
    strategy: MergeStrategy,
) -> Result<MergeOutcome> {
    if ancestry.ancestor.is_none() {
        return Err(Error::NotMergeable {
            source_branch: source_branch.to_string(),
            destination_branch: destination_branch.to_string(),
        });
    }
    let Some(newest) = ancestry.new_commits.last() else {
        return Err(Error::NothingToMerge);
    };

    let outcome = destination.locked(|| {
        let docs = destination.docs();
        let mut branches = docs.branches()?;
        let mut commits = docs.commits()?;
        let current = branches
            .value
            .get(destination_branch)
            .cloned()
            .ok_or_else(|| Error::MergeBranchNotFound {
                repo: destination.id().clone(),
                branch: destination_branch.to_string(),
            })?;
        if *current.commit() != ancestry.destination_head {
            return Err(Error::BranchMoved {
                branch: destination_branch.to_string(),
                expected: ancestry.destination_head,
                actual: *current.commit(),
            });
        }

        let head = match strategy {
            MergeStrategy::FastForward => {
                for commit in &ancestry.new_commits {
                    commits.value.insert(*commit.id(), commit.clone());
                }
                *newest.id()
            }
            MergeStrategy::MergeCommit => {
                let commit = Commit::builder(newest.tree().clone())
                    .parent(*current.commit())
                    .author(actor.signature())
                    .message(message)
                    .timestamp(Utc::now())
                    .build();
                insert_commit(&mut commits.value, commit)
            }
        };

        let count = destination.walker(&commits.value).count(&head)?;
        branches
            .value
            .insert(destination_branch.to_string(), current.with_head(head, count));

        docs.put_commits(&commits.value, commits.version)?;
        docs.put_branches(&branches.value, branches.version)?;
        Ok(MergeOutcome {
            head,
            strategy,
            merged: ancestry.new_commits.len(),
        })
    })?;

    info!(
        source = %source.id(),
        source_branch,
        destination = %destination.id(),
        destination_branch,
        strategy = %strategy,
        head = %outcome.head.short(),
        merged = outcome.merged,
        "merged branches"
    );
    destination.invalidate(actor);
    Ok(outcome)
}
