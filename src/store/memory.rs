//! In-memory document store.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{DocumentKind, DocumentStore, RawDocument, RepoId};
use crate::error::{Error, Result};

/// A [`DocumentStore`] held entirely in process memory.
///
/// Useful for tests and for embedding the engine without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    repos: RwLock<HashMap<RepoId, HashMap<DocumentKind, RawDocument>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of repositories.
    pub fn len(&self) -> usize {
        self.repos.read().len()
    }

    /// Returns `true` if no repository exists.
    pub fn is_empty(&self) -> bool {
        self.repos.read().is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn repository_exists(&self, repo: &RepoId) -> Result<bool> {
        Ok(self.repos.read().contains_key(repo))
    }

    fn create_repository(&self, repo: &RepoId) -> Result<()> {
        let mut repos = self.repos.write();
        if repos.contains_key(repo) {
            return Err(Error::RepositoryExists(repo.clone()));
        }
        repos.insert(repo.clone(), HashMap::new());
        Ok(())
    }

    fn read(&self, repo: &RepoId, kind: DocumentKind) -> Result<Option<RawDocument>> {
        let repos = self.repos.read();
        let docs = repos
            .get(repo)
            .ok_or_else(|| Error::RepositoryNotFound(repo.clone()))?;
        Ok(docs.get(&kind).cloned())
    }

    fn write(
        &self,
        repo: &RepoId,
        kind: DocumentKind,
        data: Vec<u8>,
        expected: u64,
    ) -> Result<u64> {
        let mut repos = self.repos.write();
        let docs = repos
            .get_mut(repo)
            .ok_or_else(|| Error::RepositoryNotFound(repo.clone()))?;

        let actual = docs.get(&kind).map(|d| d.version).unwrap_or(0);
        if actual != expected {
            return Err(Error::ConcurrentModification {
                repo: repo.clone(),
                kind,
                expected,
                actual,
            });
        }

        let version = actual + 1;
        docs.insert(kind, RawDocument { data, version });
        Ok(version)
    }
}
