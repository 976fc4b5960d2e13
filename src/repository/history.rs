//! Repository creation, uploads and history rewriting.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::{prune, Actor, Engine, Repository};
use crate::error::{Error, RefKind, Result};
use crate::infra::hash::sha256;
use crate::log::Walker;
use crate::objects::{insert_commit, Commit, CommitMap, EntryType, Oid, Signature, Tree, TreeEntry};
use crate::refs::{validate_ref_name, Branch, BranchMap};
use crate::store::{DocumentKind, RepoId, Versioned};

/// A database file being committed.
///
/// The bytes themselves live in the blob store; only their hash, size and
/// metadata are recorded in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    name: String,
    sha256: Oid,
    size: u64,
    last_modified: DateTime<Utc>,
    licence: Option<Oid>,
    message: Option<String>,
    author: Option<Signature>,
    committer: Option<Signature>,
    timestamp: Option<DateTime<Utc>>,
}

impl Upload {
    /// Describes an upload of `data`, hashing it.
    pub fn new(name: impl Into<String>, data: &[u8]) -> Self {
        Upload::from_blob(name, sha256(data), data.len() as u64)
    }

    /// Describes an upload already stored in the blob store.
    pub fn from_blob(name: impl Into<String>, sha256: Oid, size: u64) -> Self {
        Upload {
            name: name.into(),
            sha256,
            size,
            last_modified: Utc::now(),
            licence: None,
            message: None,
            author: None,
            committer: None,
            timestamp: None,
        }
    }

    /// Sets the licence. Without one, the previous head's licence is kept.
    pub fn licence(mut self, licence: Oid) -> Self {
        self.licence = Some(licence);
        self
    }

    /// Sets the commit message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the file's last-modified time.
    pub fn last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = at;
        self
    }

    /// Overrides the author, which otherwise is the acting user.
    pub fn author(mut self, author: Signature) -> Self {
        self.author = Some(author);
        self
    }

    /// Records a committer distinct from the author.
    pub fn committer(mut self, committer: Signature) -> Self {
        self.committer = Some(committer);
        self
    }

    /// Sets the commit time. Defaults to now.
    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// Returns the content hash.
    pub fn sha256(&self) -> &Oid {
        &self.sha256
    }

    /// Returns the size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    fn into_commit(self, parent: Option<Oid>, licence: Option<Oid>, message: String, actor: &Actor) -> Commit {
        let entry = TreeEntry::new(
            EntryType::Database,
            self.name,
            self.sha256,
            self.size,
            self.last_modified,
            licence,
        );
        let mut builder = Commit::builder(Tree::single(entry))
            .maybe_parent(parent)
            .author(self.author.unwrap_or_else(|| actor.signature()))
            .message(message);
        if let Some(committer) = self.committer {
            builder = builder.committer(committer);
        }
        if let Some(at) = self.timestamp {
            builder = builder.timestamp(at);
        }
        builder.build()
    }
}

impl Engine {
    /// Creates a repository whose first commit records `upload`.
    ///
    /// The commit lands on the configured default branch, which becomes the
    /// repository's default.
    ///
    /// The default branch document is written last and marks the repository
    /// as initialised. A repository left without it by an earlier failure is
    /// initialised again rather than refused.
    ///
    /// # Errors
    ///
    /// - `Error::RepositoryExists` if the repository already exists.
    pub fn init(&self, id: RepoId, upload: Upload, actor: &Actor) -> Result<Repository<'_>> {
        let branch_name = self.config.default_branch.clone();
        validate_ref_name(&branch_name)?;

        match self.store.create_repository(&id) {
            Ok(()) => {}
            Err(Error::RepositoryExists(_)) if !self.is_initialised(&id)? => {
                warn!(repo = %id, "resuming an interrupted repository creation");
            }
            Err(e) => return Err(e),
        }
        let repo = Repository { engine: self, id };

        let head = repo.locked(|| {
            if self.is_initialised(&repo.id)? {
                return Err(Error::RepositoryExists(repo.id.clone()));
            }
            let docs = repo.docs();
            let licence = upload.licence;
            let message = upload.message.clone().unwrap_or_else(|| match licence {
                Some(_) => format!(
                    "Initial database upload, using licence {}.",
                    self.licence_name(licence.as_ref())
                ),
                None => "Initial database upload, licence not specified.".to_string(),
            });
            let commit = upload.into_commit(None, licence, message, actor);

            let mut commits = CommitMap::new();
            let head = insert_commit(&mut commits, commit);
            let mut branches = BranchMap::new();
            branches.insert(branch_name.clone(), Branch::new(head, 1, ""));

            docs.put_commits(&commits, self.version(&repo.id, DocumentKind::Commits)?)?;
            docs.put_branches(&branches, self.version(&repo.id, DocumentKind::Branches)?)?;
            docs.put_default_branch(&branch_name, 0)?;
            Ok(head)
        })?;

        info!(repo = %repo.id, branch = %branch_name, commit = %head.short(), "created repository");
        repo.invalidate(actor);
        Ok(repo)
    }
}

impl Repository<'_> {
    /// Appends an uploaded database to the head of a branch.
    ///
    /// Returns the new commit ID.
    pub fn commit_upload(&self, branch: &str, upload: Upload, actor: &Actor) -> Result<Oid> {
        let head = self.locked(|| {
            let docs = self.docs();
            let mut branches = docs.branches()?;
            let mut commits = docs.commits()?;
            let current = branches
                .value
                .get(branch)
                .cloned()
                .ok_or_else(|| Error::not_found(RefKind::Branch, branch))?;

            let (id, updated) =
                self.append(&mut commits.value, &current, *current.commit(), upload, actor)?;
            branches.value.insert(branch.to_string(), updated);

            docs.put_commits(&commits.value, commits.version)?;
            docs.put_branches(&branches.value, branches.version)?;
            Ok(id)
        })?;

        info!(repo = %self.id, branch, commit = %head.short(), "committed upload");
        self.invalidate(actor);
        Ok(head)
    }

    /// Uploads on top of an older commit of a branch.
    ///
    /// The branch history above `parent` is discarded first, under the same
    /// rules as [`rewind_branch`](Self::rewind_branch).
    pub fn commit_upload_at(
        &self,
        branch: &str,
        parent: &Oid,
        upload: Upload,
        actor: &Actor,
    ) -> Result<Oid> {
        let head = self.locked(|| {
            let docs = self.docs();
            let mut branches = docs.branches()?;
            let mut commits = docs.commits()?;
            let tags = docs.tags()?;
            let releases = docs.releases()?;
            let current = branches
                .value
                .get(branch)
                .cloned()
                .ok_or_else(|| Error::not_found(RefKind::Branch, branch))?;

            let orphans = if current.commit() == parent {
                Vec::new()
            } else {
                let walker = self.walker(&commits.value);
                let dropped = dropped_above(&walker, current.commit(), branch, parent)?;
                prune::plan(
                    &walker,
                    &branches.value,
                    &tags.value,
                    &releases.value,
                    branch,
                    &dropped,
                )?
            };

            let (id, updated) = self.append(&mut commits.value, &current, *parent, upload, actor)?;
            let previous = branches.value.clone();
            branches.value.insert(branch.to_string(), updated);

            // the new commit must be stored before the branch points at it,
            // and the orphans removed only after it no longer does
            let version = docs.put_commits(&commits.value, commits.version)?;
            let commits = Versioned {
                value: commits.value,
                version,
            };
            prune::apply(&docs, &previous, &branches, &tags, &releases, commits, &orphans)?;
            Ok(id)
        })?;

        info!(repo = %self.id, branch, parent = %parent.short(), commit = %head.short(), "committed upload on earlier commit");
        self.invalidate(actor);
        Ok(head)
    }

    /// Builds the upload commit on `parent` and the branch entry pointing at it.
    fn append(
        &self,
        commits: &mut CommitMap,
        branch: &Branch,
        parent: Oid,
        upload: Upload,
        actor: &Actor,
    ) -> Result<(Oid, Branch)> {
        let previous = commits
            .get(&parent)
            .ok_or(Error::InvalidReference(parent))?
            .tree()
            .database()
            .and_then(|e| e.licence())
            .copied();
        let licence = upload.licence.or(previous);

        let message = match (&upload.message, upload.licence) {
            (Some(message), _) => message.clone(),
            (None, Some(new)) if Some(new) != previous => format!(
                "Database licence changed from '{}' to '{}'.",
                self.engine.licence_name(previous.as_ref()),
                self.engine.licence_name(Some(&new))
            ),
            _ => String::new(),
        };

        let count = self.walker(commits).count(&parent)? + 1;
        let commit = upload.into_commit(Some(parent), licence, message, actor);
        let id = insert_commit(commits, commit);
        Ok((id, branch.with_head(id, count)))
    }

    /// Returns `true` if `commit` is in the history of `branch`.
    pub fn is_commit_in_branch(&self, branch: &str, commit: &Oid) -> Result<bool> {
        let head = *self.branch(branch)?.commit();
        let commits = self.commits()?;
        self.walker(&commits).contains(&head, commit)
    }

    /// Moves a branch head back to an earlier commit of its own history.
    ///
    /// Commits above `commit` that no other branch reaches are deleted. A
    /// no-op if the branch already points at `commit`.
    ///
    /// # Errors
    ///
    /// - `Error::RefNotFound` if the branch does not exist.
    /// - `Error::NotInBranchHistory` if `commit` is not in the branch history.
    /// - `Error::IsolationConflict` if a tag or release would become
    ///   unreachable.
    pub fn rewind_branch(&self, branch: &str, commit: &Oid, actor: &Actor) -> Result<Branch> {
        let target = *commit;
        self.rewind(branch, actor, |_, _| Ok(target))
    }

    /// Removes the newest commit of a branch.
    ///
    /// `expected_head` guards against removing a commit the caller has not
    /// seen.
    ///
    /// # Errors
    ///
    /// - `Error::BranchMoved` if the head is not `expected_head`.
    /// - `Error::CannotRemoveRootCommit` if the head has no parent.
    pub fn delete_head_commit(
        &self,
        branch: &str,
        expected_head: &Oid,
        actor: &Actor,
    ) -> Result<Branch> {
        self.rewind(branch, actor, |current, commits| {
            if current.commit() != expected_head {
                return Err(Error::BranchMoved {
                    branch: branch.to_string(),
                    expected: *expected_head,
                    actual: *current.commit(),
                });
            }
            let head = commits
                .get(current.commit())
                .ok_or(Error::InvalidReference(*current.commit()))?;
            head.parent()
                .copied()
                .ok_or_else(|| Error::CannotRemoveRootCommit(branch.to_string()))
        })
    }

    /// Rewinds `branch` to the commit chosen by `target`, under the lock.
    fn rewind(
        &self,
        branch: &str,
        actor: &Actor,
        target: impl FnOnce(&Branch, &CommitMap) -> Result<Oid>,
    ) -> Result<Branch> {
        let (updated, removed) = self.locked(|| {
            let docs = self.docs();
            let mut branches = docs.branches()?;
            let commits = docs.commits()?;
            let current = branches
                .value
                .get(branch)
                .cloned()
                .ok_or_else(|| Error::not_found(RefKind::Branch, branch))?;

            let target = target(&current, &commits.value)?;
            if *current.commit() == target {
                return Ok((current, None));
            }

            let tags = docs.tags()?;
            let releases = docs.releases()?;
            let (orphans, count) = {
                let walker = self.walker(&commits.value);
                let dropped = dropped_above(&walker, current.commit(), branch, &target)?;
                let orphans = prune::plan(
                    &walker,
                    &branches.value,
                    &tags.value,
                    &releases.value,
                    branch,
                    &dropped,
                )?;
                (orphans, walker.count(&target)?)
            };

            let updated = current.with_head(target, count);
            let previous = branches.value.clone();
            branches.value.insert(branch.to_string(), updated.clone());
            prune::apply(&docs, &previous, &branches, &tags, &releases, commits, &orphans)?;
            Ok((updated, Some(orphans.len())))
        })?;

        if let Some(removed) = removed {
            info!(repo = %self.id, branch, commit = %updated.short_oid(), removed_commits = removed, "rewound branch");
            self.invalidate(actor);
        }
        Ok(updated)
    }
}

/// The commits of the chain ending at `head` that are newer than `target`.
fn dropped_above(
    walker: &Walker<'_>,
    head: &Oid,
    branch: &str,
    target: &Oid,
) -> Result<HashSet<Oid>> {
    let branch_ids = walker.commit_ids(head)?;
    if !branch_ids.contains(target) {
        return Err(Error::NotInBranchHistory {
            branch: branch.to_string(),
            commit: *target,
        });
    }
    let kept = walker.commit_ids(target)?;
    Ok(branch_ids.difference(&kept).copied().collect())
}
