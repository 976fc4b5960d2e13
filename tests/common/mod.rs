//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use dbgraph::objects::CommitMap;
use dbgraph::refs::{BranchMap, ReleaseMap, TagMap};
use dbgraph::store::{
    BlobStore, CacheInvalidator, CacheKey, DocumentKind, DocumentStore, RawDocument,
};
use dbgraph::{Actor, Engine, Error, MemoryStore, Oid, RepoId, Repository, Result, Upload};

pub const DB: &str = "birds.sqlite";

/// Records every invalidation it receives.
#[derive(Debug, Default)]
pub struct RecordingCache {
    keys: Mutex<Vec<CacheKey>>,
}

impl RecordingCache {
    pub fn keys(&self) -> Vec<CacheKey> {
        self.keys.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.keys.lock().unwrap().clear();
    }
}

impl CacheInvalidator for RecordingCache {
    fn invalidate(&self, key: &CacheKey) -> Result<()> {
        self.keys.lock().unwrap().push(key.clone());
        Ok(())
    }
}

/// Always fails.
#[derive(Debug, Default)]
pub struct BrokenCache;

impl CacheInvalidator for BrokenCache {
    fn invalidate(&self, _key: &CacheKey) -> Result<()> {
        Err(Error::Storage(dbgraph::error::StorageError::Io(
            std::io::Error::new(std::io::ErrorKind::Other, "cache offline"),
        )))
    }
}

/// A blob store holding fixed sizes.
#[derive(Debug, Default)]
pub struct SizedBlobs {
    pub sizes: BTreeMap<Oid, u64>,
}

impl BlobStore for SizedBlobs {
    fn size(&self, sha256: &Oid) -> Result<Option<u64>> {
        Ok(self.sizes.get(sha256).copied())
    }
}

type Hook = Box<dyn FnOnce() -> Result<()> + Send>;

/// An in-memory store that runs a one-shot hook before a document write.
///
/// A hook returning an error fails the write without storing anything.
#[derive(Default)]
pub struct HookedStore {
    inner: MemoryStore,
    hook: Mutex<Option<(DocumentKind, Hook)>>,
}

impl HookedStore {
    pub fn new() -> Self {
        HookedStore::default()
    }

    /// Runs `hook` before the next write of `kind`.
    pub fn before_write(
        &self,
        kind: DocumentKind,
        hook: impl FnOnce() -> Result<()> + Send + 'static,
    ) {
        *self.hook.lock().unwrap() = Some((kind, Box::new(hook)));
    }

    /// Fails the next write of `kind` with an I/O error.
    pub fn fail_write(&self, kind: DocumentKind) {
        self.before_write(kind, || {
            Err(Error::Storage(dbgraph::error::StorageError::Io(
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            )))
        });
    }
}

impl DocumentStore for HookedStore {
    fn repository_exists(&self, repo: &RepoId) -> Result<bool> {
        self.inner.repository_exists(repo)
    }

    fn create_repository(&self, repo: &RepoId) -> Result<()> {
        self.inner.create_repository(repo)
    }

    fn read(&self, repo: &RepoId, kind: DocumentKind) -> Result<Option<RawDocument>> {
        self.inner.read(repo, kind)
    }

    fn write(
        &self,
        repo: &RepoId,
        kind: DocumentKind,
        data: Vec<u8>,
        expected: u64,
    ) -> Result<u64> {
        let hook = {
            let mut slot = self.hook.lock().unwrap();
            match slot.take() {
                Some((k, hook)) if k == kind => Some(hook),
                other => {
                    *slot = other;
                    None
                }
            }
        };
        if let Some(hook) = hook {
            hook()?;
        }
        self.inner.write(repo, kind, data, expected)
    }
}

/// Counts `ERROR` events emitted on the current thread while installed.
#[derive(Debug, Clone, Default)]
pub struct ErrorEvents(Arc<AtomicUsize>);

impl ErrorEvents {
    /// Runs `f` with this counter as the thread's subscriber.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::subscriber::with_default(self.clone(), f)
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl tracing::Subscriber for ErrorEvents {
    fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
        tracing::span::Id::from_u64(1)
    }

    fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}

    fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}

    fn event(&self, event: &tracing::Event<'_>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn enter(&self, _: &tracing::span::Id) {}

    fn exit(&self, _: &tracing::span::Id) {}
}

pub fn ann() -> Actor {
    Actor::new("ann", "Ann Example", "ann@example.org")
}

pub fn bob() -> Actor {
    Actor::new("bob", "Bob Example", "bob@example.org")
}

/// A fixed point in time, `n` minutes after the epoch of the fixtures.
pub fn at(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(n as i64)
}

/// A deterministic upload whose content is `n`.
pub fn upload(n: u32) -> Upload {
    Upload::new(DB, &n.to_be_bytes())
        .last_modified(at(0))
        .timestamp(at(n))
        .message(format!("upload {}", n))
}

pub fn engine() -> (Engine, Arc<RecordingCache>) {
    let cache = Arc::new(RecordingCache::default());
    let engine = Engine::new(Arc::new(MemoryStore::new())).with_cache(cache.clone());
    (engine, cache)
}

/// An engine over a store the test keeps a handle to.
pub fn engine_over<S: DocumentStore + 'static>(store: &Arc<S>) -> Engine {
    Engine::new(store.clone())
}

/// Replaces the commit map behind the engine's back.
pub fn overwrite_commits(store: &dyn DocumentStore, commits: &CommitMap) {
    let id = repo_id();
    let docs = dbgraph::store::Documents::new(store, &id);
    let version = docs.commits().unwrap().version;
    docs.put_commits(commits, version).unwrap();
}

pub fn repo_id() -> RepoId {
    RepoId::new("ann", DB)
}

/// Creates the fixture repository with one commit on `master`.
pub fn init(engine: &Engine) -> Repository<'_> {
    engine.init(repo_id(), upload(0), &ann()).unwrap()
}

/// Appends `count` uploads to `branch`, starting at content `first`.
pub fn append(repo: &Repository<'_>, branch: &str, first: u32, count: u32) -> Vec<Oid> {
    (first..first + count)
        .map(|n| repo.commit_upload(branch, upload(n), &ann()).unwrap())
        .collect()
}

pub fn head(repo: &Repository<'_>, branch: &str) -> Oid {
    *repo.branch(branch).unwrap().commit()
}

/// Every document of a repository, for before/after comparisons.
#[derive(Debug, PartialEq)]
pub struct Snapshot {
    pub commits: CommitMap,
    pub branches: BranchMap,
    pub tags: TagMap,
    pub releases: ReleaseMap,
    pub default_branch: String,
}

pub fn snapshot(repo: &Repository<'_>) -> Snapshot {
    Snapshot {
        commits: repo.commits().unwrap(),
        branches: repo.branches().unwrap(),
        tags: repo.tags().unwrap(),
        releases: repo.releases().unwrap(),
        default_branch: repo.default_branch().unwrap(),
    }
}
