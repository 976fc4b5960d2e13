//! Collaborators the engine calls but does not own: cache, blob store and
//! licence lookup.

use std::collections::BTreeMap;

use super::RepoId;
use crate::error::Result;
use crate::objects::Oid;

/// Identifies cached renderings of a repository to drop after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    /// The user that performed the mutation.
    pub user: String,
    /// The affected repository.
    pub repo: RepoId,
    /// A single commit, or `None` for every version of the repository.
    pub commit: Option<Oid>,
}

impl CacheKey {
    /// A key covering every version of `repo`.
    pub fn repository(user: impl Into<String>, repo: &RepoId) -> Self {
        CacheKey {
            user: user.into(),
            repo: repo.clone(),
            commit: None,
        }
    }
}

/// Drops cached data after branches, tags, releases or commits change.
pub trait CacheInvalidator: Send + Sync {
    /// Invalidates everything matching `key`.
    fn invalidate(&self, key: &CacheKey) -> Result<()>;
}

/// A cache invalidator for deployments without a cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl CacheInvalidator for NoopCache {
    fn invalidate(&self, _key: &CacheKey) -> Result<()> {
        Ok(())
    }
}

/// Content-addressed storage of the database files themselves.
pub trait BlobStore: Send + Sync {
    /// Returns the size of the blob with this SHA-256, `None` if absent.
    fn size(&self, sha256: &Oid) -> Result<Option<u64>>;
}

/// Resolves licence hashes to display names.
pub trait LicenceDirectory: Send + Sync {
    /// Returns the display name of a licence, `None` if unknown.
    fn name(&self, licence: &Oid) -> Option<String>;
}

impl LicenceDirectory for BTreeMap<Oid, String> {
    fn name(&self, licence: &Oid) -> Option<String> {
        self.get(licence).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_key_covers_all_commits() {
        let repo = RepoId::new("alice", "a.sqlite");
        let key = CacheKey::repository("bob", &repo);
        assert_eq!(key.user, "bob");
        assert_eq!(key.repo, repo);
        assert!(key.commit.is_none());
        assert!(NoopCache.invalidate(&key).is_ok());
    }

    #[test]
    fn test_map_licence_directory() {
        let mut names = BTreeMap::new();
        let mit = Oid::from_bytes([9; 32]);
        names.insert(mit, "MIT".to_string());
        assert_eq!(names.name(&mit).as_deref(), Some("MIT"));
        assert_eq!(names.name(&Oid::from_bytes([1; 32])), None);
    }
}
