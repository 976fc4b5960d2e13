//! Branch lifecycle: create, rename, set default, delete.

use std::collections::HashSet;

use tracing::{error, info};

use super::{prune, Actor, Repository};
use crate::error::{Error, RefKind, Result};
use crate::objects::Oid;
use crate::refs::{validate_ref_name, Branch};

impl Repository<'_> {
    /// Creates a branch pointing at an existing commit.
    ///
    /// The new branch's commit count is the length of the history ending at
    /// `commit`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidRefName` if the name is invalid.
    /// - `Error::RefAlreadyExists` if a branch with this name already exists.
    /// - `Error::InvalidReference` if `commit` is not in the commit map.
    pub fn create_branch(
        &self,
        name: &str,
        commit: &Oid,
        description: &str,
        actor: &Actor,
    ) -> Result<Branch> {
        validate_ref_name(name)?;

        let branch = self.locked(|| {
            let docs = self.docs();
            let mut branches = docs.branches()?;
            if branches.value.contains_key(name) {
                return Err(Error::exists(RefKind::Branch, name));
            }

            let commits = docs.commits()?;
            if !commits.value.contains_key(commit) {
                return Err(Error::InvalidReference(*commit));
            }
            let count = self.walker(&commits.value).count(commit)?;

            let branch = Branch::new(*commit, count, description);
            branches.value.insert(name.to_string(), branch.clone());
            docs.put_branches(&branches.value, branches.version)?;
            Ok(branch)
        })?;

        info!(repo = %self.id, branch = name, commit = %commit.short(), "created branch");
        self.invalidate(actor);
        Ok(branch)
    }

    /// Renames a branch and replaces its description.
    ///
    /// Renaming the default branch moves the default pointer with it. The
    /// pointer is written first and restored if the branch write fails.
    pub fn rename_branch(
        &self,
        old_name: &str,
        new_name: &str,
        description: &str,
        actor: &Actor,
    ) -> Result<Branch> {
        validate_ref_name(new_name)?;

        let branch = self.locked(|| {
            let docs = self.docs();
            let mut branches = docs.branches()?;
            let current = branches
                .value
                .remove(old_name)
                .ok_or_else(|| Error::not_found(RefKind::Branch, old_name))?;
            if new_name != old_name && branches.value.contains_key(new_name) {
                return Err(Error::exists(RefKind::Branch, new_name));
            }
            let renamed = current.with_description(description);
            branches.value.insert(new_name.to_string(), renamed.clone());

            let default = docs.default_branch()?;
            let moved_default = default.value == old_name && new_name != old_name;
            let default_version = if moved_default {
                Some(docs.put_default_branch(new_name, default.version)?)
            } else {
                None
            };

            if let Err(e) = docs.put_branches(&branches.value, branches.version) {
                if let Some(version) = default_version {
                    if let Err(restore) = docs.put_default_branch(old_name, version) {
                        error!(repo = %self.id, branch = old_name, error = %restore, "failed to restore default branch after rename failure");
                    }
                }
                return Err(e);
            }
            Ok(renamed)
        })?;

        info!(repo = %self.id, from = old_name, to = new_name, "renamed branch");
        self.invalidate(actor);
        Ok(branch)
    }

    /// Makes `name` the default branch.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidBranch` if `name` is not a branch.
    pub fn set_default_branch(&self, name: &str, actor: &Actor) -> Result<()> {
        self.locked(|| {
            let docs = self.docs();
            if !docs.branches()?.value.contains_key(name) {
                return Err(Error::InvalidBranch(name.to_string()));
            }
            let default = docs.default_branch()?;
            if default.value != name {
                docs.put_default_branch(name, default.version)?;
            }
            Ok(())
        })?;

        info!(repo = %self.id, branch = name, "set default branch");
        self.invalidate(actor);
        Ok(())
    }

    /// Deletes a branch and every commit only it reaches.
    ///
    /// The checks and the writes happen under the repository lock, against
    /// the exact document versions that are then replaced. The tag and
    /// release maps are rewritten unchanged at the versions checked, so a
    /// writer in another process cannot tag a commit while it is pruned.
    ///
    /// # Errors
    ///
    /// - `Error::RefNotFound` if the branch does not exist.
    /// - `Error::CannotDeleteDefaultBranch` for the default branch.
    /// - `Error::IsolationConflict` if a tag or release would become
    ///   unreachable. Nothing is changed.
    /// - `Error::BrokenHistory` if any branch history is corrupt.
    pub fn delete_branch(&self, name: &str, actor: &Actor) -> Result<()> {
        let removed = self.locked(|| {
            let docs = self.docs();
            let mut branches = docs.branches()?;
            let Some(branch) = branches.value.get(name).cloned() else {
                return Err(Error::not_found(RefKind::Branch, name));
            };
            if docs.default_branch()?.value == name {
                return Err(Error::CannotDeleteDefaultBranch(name.to_string()));
            }

            let commits = docs.commits()?;
            let tags = docs.tags()?;
            let releases = docs.releases()?;

            let orphans = {
                let walker = self.walker(&commits.value);
                let dropped: HashSet<Oid> = walker.commit_ids(branch.commit())?;
                prune::plan(
                    &walker,
                    &branches.value,
                    &tags.value,
                    &releases.value,
                    name,
                    &dropped,
                )?
            };

            let previous = branches.value.clone();
            branches.value.remove(name);
            prune::apply(&docs, &previous, &branches, &tags, &releases, commits, &orphans)?;
            Ok(orphans.len())
        })?;

        info!(repo = %self.id, branch = name, removed_commits = removed, "deleted branch");
        self.invalidate(actor);
        Ok(())
    }
}
