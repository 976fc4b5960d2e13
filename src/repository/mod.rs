//! Repository operations.
//!
//! An [`Engine`] holds the injected collaborators and configuration; a
//! [`Repository`] is a handle on one hosted database obtained from it.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use dbgraph::{Actor, Engine, MemoryStore, RepoId, Upload};
//!
//! let engine = Engine::new(Arc::new(MemoryStore::new()));
//! let ann = Actor::new("ann", "Ann Example", "ann@example.org");
//! let id = RepoId::new("ann", "birds.sqlite");
//!
//! let repo = engine.init(id, Upload::new("birds.sqlite", b"v1"), &ann).unwrap();
//! let root = *repo.branch("master").unwrap().commit();
//! repo.create_branch("survey-2024", &root, "field data", &ann).unwrap();
//!
//! assert_eq!(repo.branches().unwrap().len(), 2);
//! ```

mod branches;
mod history;
mod licence;
pub mod locks;
mod prune;
mod tags;

use std::fmt;
use std::sync::Arc;

use tracing::warn;

pub use history::Upload;
pub use licence::LicenceChange;
pub use locks::LockTable;

use crate::config::EngineConfig;
use crate::error::{Error, RefKind, Result};
use crate::log::Walker;
use crate::objects::{Commit, CommitMap, Oid, Signature};
use crate::refs::{Branch, BranchMap, Release, ReleaseMap, Tag, TagMap};
use crate::store::{
    BlobStore, CacheInvalidator, CacheKey, DocumentKind, DocumentStore, Documents,
    LicenceDirectory, NoopCache, RepoId,
};

/// The user on whose behalf an operation runs.
///
/// Identity lookup happens outside the engine; callers pass the result in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Login name, used to key cache invalidation.
    pub username: String,
    /// Full name recorded in commits, tags and releases.
    pub display_name: String,
    /// Email address recorded alongside the name.
    pub email: String,
}

impl Actor {
    /// Creates a new Actor.
    pub fn new(
        username: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Actor {
            username: username.into(),
            display_name: display_name.into(),
            email: email.into(),
        }
    }

    /// Returns the signature recorded for this actor.
    pub fn signature(&self) -> Signature {
        Signature::new(&self.display_name, &self.email)
    }
}

/// Shared state for operating on many repositories.
pub struct Engine {
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn CacheInvalidator>,
    blobs: Option<Arc<dyn BlobStore>>,
    licences: Option<Arc<dyn LicenceDirectory>>,
    config: EngineConfig,
    locks: LockTable,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("blob_store", &self.blobs.is_some())
            .field("licence_directory", &self.licences.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine over `store` with default configuration and no cache.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Engine {
            store,
            cache: Arc::new(NoopCache),
            blobs: None,
            licences: None,
            config: EngineConfig::default(),
            locks: LockTable::new(),
        }
    }

    /// Replaces the configuration.
    ///
    /// Fails with `Error::InvalidConfig` if the configuration does not
    /// validate.
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Sets the cache invalidated after every mutation.
    pub fn with_cache(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the blob store used to size releases.
    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Sets the directory used to name licences in commit messages.
    pub fn with_licence_directory(mut self, licences: Arc<dyn LicenceDirectory>) -> Self {
        self.licences = Some(licences);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Opens an existing repository.
    ///
    /// # Errors
    ///
    /// - `Error::RepositoryNotFound` if it has not been created, or its
    ///   creation never completed.
    pub fn open(&self, id: RepoId) -> Result<Repository<'_>> {
        if !self.store.repository_exists(&id)? || !self.is_initialised(&id)? {
            return Err(Error::RepositoryNotFound(id));
        }
        Ok(Repository { engine: self, id })
    }

    /// Returns `true` once the default branch document has been written.
    pub(crate) fn is_initialised(&self, id: &RepoId) -> Result<bool> {
        Ok(self.version(id, DocumentKind::DefaultBranch)? > 0)
    }

    /// Returns the stored version of a document, 0 if never written.
    pub(crate) fn version(&self, id: &RepoId, kind: DocumentKind) -> Result<u64> {
        Ok(self.store.read(id, kind)?.map_or(0, |raw| raw.version))
    }

    /// Returns the display name of a licence for commit messages.
    pub(crate) fn licence_name(&self, licence: Option<&Oid>) -> String {
        match licence {
            None => "Not specified".to_string(),
            Some(hash) => self
                .licences
                .as_ref()
                .and_then(|dir| dir.name(hash))
                .unwrap_or_else(|| hash.short()),
        }
    }
}

/// A handle on one hosted database.
#[derive(Debug, Clone)]
pub struct Repository<'e> {
    engine: &'e Engine,
    id: RepoId,
}

impl<'e> Repository<'e> {
    /// Returns the repository ID.
    pub fn id(&self) -> &RepoId {
        &self.id
    }

    /// Returns the engine this handle belongs to.
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub(crate) fn docs(&self) -> Documents<'_> {
        Documents::new(self.engine.store.as_ref(), &self.id)
    }

    pub(crate) fn walker<'a>(&'a self, commits: &'a CommitMap) -> Walker<'a> {
        Walker::new(&self.id, commits, self.engine.config.max_history_depth)
    }

    /// Runs `f` while holding this repository's lock.
    pub(crate) fn locked<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.engine.locks.get(&self.id);
        let _guard = lock.lock();
        f()
    }

    /// Drops cached renderings of every version. Failures are only logged.
    pub(crate) fn invalidate(&self, actor: &Actor) {
        let key = CacheKey::repository(&actor.username, &self.id);
        if let Err(e) = self.engine.cache.invalidate(&key) {
            warn!(repo = %self.id, user = %actor.username, error = %e, "cache invalidation failed");
        }
    }

    /// Returns every branch.
    pub fn branches(&self) -> Result<BranchMap> {
        Ok(self.docs().branches()?.value)
    }

    /// Returns one branch.
    pub fn branch(&self, name: &str) -> Result<Branch> {
        self.branches()?
            .remove(name)
            .ok_or_else(|| Error::not_found(RefKind::Branch, name))
    }

    /// Returns the default branch name.
    pub fn default_branch(&self) -> Result<String> {
        Ok(self.docs().default_branch()?.value)
    }

    /// Returns every tag.
    pub fn tags(&self) -> Result<TagMap> {
        Ok(self.docs().tags()?.value)
    }

    /// Returns one tag.
    pub fn tag(&self, name: &str) -> Result<Tag> {
        self.tags()?
            .remove(name)
            .ok_or_else(|| Error::not_found(RefKind::Tag, name))
    }

    /// Returns every release.
    pub fn releases(&self) -> Result<ReleaseMap> {
        Ok(self.docs().releases()?.value)
    }

    /// Returns one release.
    pub fn release(&self, name: &str) -> Result<Release> {
        self.releases()?
            .remove(name)
            .ok_or_else(|| Error::not_found(RefKind::Release, name))
    }

    /// Returns every commit.
    pub fn commits(&self) -> Result<CommitMap> {
        Ok(self.docs().commits()?.value)
    }

    /// Returns one commit.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidReference` if no such commit exists.
    pub fn commit(&self, id: &Oid) -> Result<Commit> {
        self.commits()?
            .remove(id)
            .ok_or(Error::InvalidReference(*id))
    }

    /// Returns the history of a branch, newest first.
    pub fn history(&self, branch: &str) -> Result<Vec<Commit>> {
        let head = *self.branch(branch)?.commit();
        let commits = self.commits()?;
        let chain = self.walker(&commits).chain(&head)?;
        Ok(chain.into_iter().cloned().collect())
    }

    /// Returns the licence hash of the database recorded by a commit.
    pub fn licence_of(&self, commit: &Oid) -> Result<Option<Oid>> {
        let commit = self.commit(commit)?;
        Ok(commit.tree().database().and_then(|e| e.licence()).copied())
    }
}
