//! Tag and release lifecycle.
//!
//! Deleting either is unconditional: only branch deletion prunes commits, so
//! removing a name can never orphan history.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;

use super::{Actor, Repository};
use crate::error::{Error, RefKind, Result};
use crate::objects::Oid;
use crate::refs::{validate_ref_name, Release, Tag};

/// Renames `old` to `new` in `map`, replacing the entry with `update(entry)`.
fn rename_entry<T: Clone>(
    map: &mut BTreeMap<String, T>,
    kind: RefKind,
    old: &str,
    new: &str,
    update: impl FnOnce(&T) -> T,
) -> Result<T> {
    let current = map.get(old).ok_or_else(|| Error::not_found(kind, old))?;
    if new != old && map.contains_key(new) {
        return Err(Error::exists(kind, new));
    }
    let updated = update(current);
    map.remove(old);
    map.insert(new.to_string(), updated.clone());
    Ok(updated)
}

impl Repository<'_> {
    /// Creates a tag on an existing commit.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidRefName` if the name is invalid.
    /// - `Error::RefAlreadyExists` if the tag exists.
    /// - `Error::InvalidReference` if `commit` does not exist.
    pub fn create_tag(
        &self,
        name: &str,
        commit: &Oid,
        description: &str,
        actor: &Actor,
    ) -> Result<Tag> {
        validate_ref_name(name)?;

        let tag = self.locked(|| {
            let docs = self.docs();
            let mut tags = docs.tags()?;
            if tags.value.contains_key(name) {
                return Err(Error::exists(RefKind::Tag, name));
            }
            let commits = docs.commits()?;
            if !commits.value.contains_key(commit) {
                return Err(Error::InvalidReference(*commit));
            }
            // conflicts with a concurrent prune of `commit`
            docs.put_commits(&commits.value, commits.version)?;

            let tag = Tag::new(*commit, Utc::now(), description, actor.signature());
            tags.value.insert(name.to_string(), tag.clone());
            docs.put_tags(&tags.value, tags.version)?;
            Ok(tag)
        })?;

        info!(repo = %self.id, tag = name, commit = %commit.short(), "created tag");
        self.invalidate(actor);
        Ok(tag)
    }

    /// Renames a tag and replaces its description.
    ///
    /// The target commit, tagger and date are preserved.
    pub fn update_tag(
        &self,
        old_name: &str,
        new_name: &str,
        description: &str,
        actor: &Actor,
    ) -> Result<Tag> {
        validate_ref_name(new_name)?;

        let tag = self.locked(|| {
            let docs = self.docs();
            let mut tags = docs.tags()?;
            let tag = rename_entry(&mut tags.value, RefKind::Tag, old_name, new_name, |t| {
                t.with_description(description)
            })?;
            docs.put_tags(&tags.value, tags.version)?;
            Ok(tag)
        })?;

        info!(repo = %self.id, from = old_name, to = new_name, "updated tag");
        self.invalidate(actor);
        Ok(tag)
    }

    /// Deletes a tag.
    pub fn delete_tag(&self, name: &str, actor: &Actor) -> Result<()> {
        self.locked(|| {
            let docs = self.docs();
            let mut tags = docs.tags()?;
            if tags.value.remove(name).is_none() {
                return Err(Error::not_found(RefKind::Tag, name));
            }
            docs.put_tags(&tags.value, tags.version)?;
            Ok(())
        })?;

        info!(repo = %self.id, tag = name, "deleted tag");
        self.invalidate(actor);
        Ok(())
    }

    /// Creates a release on an existing commit, recording the database size.
    ///
    /// The size comes from the blob store when one is configured, otherwise
    /// from the commit's tree entry.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidRefName` if the name is invalid.
    /// - `Error::RefAlreadyExists` if the release exists.
    /// - `Error::InvalidReference` if `commit` does not exist or its database
    ///   is missing from the blob store.
    /// - `Error::EmptyTree` if the commit records no database.
    pub fn create_release(
        &self,
        name: &str,
        commit: &Oid,
        description: &str,
        actor: &Actor,
    ) -> Result<Release> {
        validate_ref_name(name)?;

        let release = self.locked(|| {
            let docs = self.docs();
            let mut releases = docs.releases()?;
            if releases.value.contains_key(name) {
                return Err(Error::exists(RefKind::Release, name));
            }

            let commits = docs.commits()?;
            let target = commits
                .value
                .get(commit)
                .ok_or(Error::InvalidReference(*commit))?;
            let entry = target
                .tree()
                .database()
                .ok_or(Error::EmptyTree(*commit))?;
            let size = match &self.engine.blobs {
                Some(blobs) => blobs
                    .size(entry.sha256())?
                    .ok_or(Error::InvalidReference(*entry.sha256()))?,
                None => entry.size(),
            };

            docs.put_commits(&commits.value, commits.version)?;

            let release = Release::new(*commit, Utc::now(), description, actor.signature(), size);
            releases.value.insert(name.to_string(), release.clone());
            docs.put_releases(&releases.value, releases.version)?;
            Ok(release)
        })?;

        info!(repo = %self.id, release = name, commit = %commit.short(), size = release.size(), "created release");
        self.invalidate(actor);
        Ok(release)
    }

    /// Renames a release and replaces its notes.
    ///
    /// The target commit, releaser, date and size are preserved.
    pub fn update_release(
        &self,
        old_name: &str,
        new_name: &str,
        description: &str,
        actor: &Actor,
    ) -> Result<Release> {
        validate_ref_name(new_name)?;

        let release = self.locked(|| {
            let docs = self.docs();
            let mut releases = docs.releases()?;
            let release = rename_entry(
                &mut releases.value,
                RefKind::Release,
                old_name,
                new_name,
                |r| r.with_description(description),
            )?;
            docs.put_releases(&releases.value, releases.version)?;
            Ok(release)
        })?;

        info!(repo = %self.id, from = old_name, to = new_name, "updated release");
        self.invalidate(actor);
        Ok(release)
    }

    /// Deletes a release.
    pub fn delete_release(&self, name: &str, actor: &Actor) -> Result<()> {
        self.locked(|| {
            let docs = self.docs();
            let mut releases = docs.releases()?;
            if releases.value.remove(name).is_none() {
                return Err(Error::not_found(RefKind::Release, name));
            }
            docs.put_releases(&releases.value, releases.version)?;
            Ok(())
        })?;

        info!(repo = %self.id, release = name, "deleted release");
        self.invalidate(actor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_entry_moves_key() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1);
        map.insert("b".to_string(), 2);

        let updated = rename_entry(&mut map, RefKind::Tag, "a", "c", |v| v * 10).unwrap();
        assert_eq!(updated, 10);
        assert_eq!(map.get("c"), Some(&10));
        assert!(!map.contains_key("a"));
    }

    #[test]
    fn test_rename_entry_same_name_updates_in_place() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1);
        rename_entry(&mut map, RefKind::Tag, "a", "a", |v| v + 1).unwrap();
        assert_eq!(map.get("a"), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_rename_entry_errors_leave_map_unchanged() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1);
        map.insert("b".to_string(), 2);

        assert!(matches!(
            rename_entry(&mut map, RefKind::Release, "zz", "y", |v| *v),
            Err(Error::RefNotFound { kind: RefKind::Release, .. })
        ));
        assert!(matches!(
            rename_entry(&mut map, RefKind::Release, "a", "b", |v| *v),
            Err(Error::RefAlreadyExists { .. })
        ));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&1));
    }
}
