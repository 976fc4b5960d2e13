//! Licence-change commits.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;

use super::{Actor, Repository};
use crate::error::{Error, RefKind, Result};
use crate::objects::{insert_commit, Commit, CommitMap, EntryType, Oid, Tree};
use crate::refs::{Branch, BranchMap};

/// The result of applying a licence to one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenceChange {
    /// `true` if a new commit was created.
    pub changed: bool,
    /// The branch head after the change.
    pub commit: Oid,
    /// The branch entry after the change.
    pub branch: Branch,
}

impl Repository<'_> {
    /// Records a licence change on one branch, in memory.
    ///
    /// If the head's database already carries `licence`, nothing happens and
    /// `changed` is `false`. Otherwise a commit identical to the head except
    /// for the licence is appended to `commits` and the branch entry in
    /// `branches` moves to it. Storing both maps is left to the caller so
    /// several branches can be changed with one write each; see
    /// [`change_licence`](Self::change_licence).
    pub fn apply_licence_change(
        &self,
        commits: &mut CommitMap,
        branches: &mut BranchMap,
        branch: &str,
        licence: Option<Oid>,
        actor: &Actor,
    ) -> Result<LicenceChange> {
        let current = branches
            .get(branch)
            .cloned()
            .ok_or_else(|| Error::not_found(RefKind::Branch, branch))?;
        let head = commits
            .get(current.commit())
            .ok_or(Error::InvalidReference(*current.commit()))?;
        let entry = head
            .tree()
            .database()
            .ok_or(Error::EmptyTree(*current.commit()))?;

        let previous = entry.licence().copied();
        if previous == licence {
            return Ok(LicenceChange {
                changed: false,
                commit: *current.commit(),
                branch: current,
            });
        }

        let entries = head
            .tree()
            .entries()
            .iter()
            .map(|e| match e.entry_type() {
                EntryType::Database => e.with_licence(licence),
                _ => e.clone(),
            })
            .collect();
        let message = format!(
            "Database licence changed from '{}' to '{}'.",
            self.engine.licence_name(previous.as_ref()),
            self.engine.licence_name(licence.as_ref())
        );
        let commit = Commit::builder(Tree::new(entries))
            .parent(*current.commit())
            .author(actor.signature())
            .message(message)
            .timestamp(Utc::now())
            .build();

        let id = insert_commit(commits, commit);
        let updated = current.with_head(id, current.commit_count() + 1);
        branches.insert(branch.to_string(), updated.clone());
        Ok(LicenceChange {
            changed: true,
            commit: id,
            branch: updated,
        })
    }

    /// Applies a licence to every branch and stores the result once.
    pub fn change_licence(
        &self,
        licence: Option<Oid>,
        actor: &Actor,
    ) -> Result<BTreeMap<String, LicenceChange>> {
        let changes = self.locked(|| {
            let docs = self.docs();
            let mut commits = docs.commits()?;
            let mut branches = docs.branches()?;

            let names: Vec<String> = branches.value.keys().cloned().collect();
            let mut changes = BTreeMap::new();
            for name in names {
                let change = self.apply_licence_change(
                    &mut commits.value,
                    &mut branches.value,
                    &name,
                    licence,
                    actor,
                )?;
                changes.insert(name, change);
            }

            if changes.values().any(|c| c.changed) {
                docs.put_commits(&commits.value, commits.version)?;
                docs.put_branches(&branches.value, branches.version)?;
            }
            Ok(changes)
        })?;

        let changed = changes.values().filter(|c| c.changed).count();
        if changed > 0 {
            info!(repo = %self.id, branches = changed, "changed database licence");
            self.invalidate(actor);
        }
        Ok(changes)
    }
}
