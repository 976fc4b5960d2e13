//! Per-repository mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::store::RepoId;

/// Unused entries are dropped once the table grows past this many.
const PRUNE_THRESHOLD: usize = 1024;

/// Hands out one mutex per repository.
///
/// Multi-step mutations hold their repository's mutex from the first read
/// to the last write. Different repositories never contend.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: Mutex<HashMap<RepoId, Arc<Mutex<()>>>>,
}

impl LockTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex guarding `repo`.
    pub fn get(&self, repo: &RepoId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        if locks.len() >= PRUNE_THRESHOLD {
            // only the table itself holds a reference: nobody is locking it
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry(repo.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns the number of tracked repositories.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Returns `true` if no repository is tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_same_repo_same_lock() {
        let table = LockTable::new();
        let a = table.get(&RepoId::new("alice", "a.sqlite"));
        let b = table.get(&RepoId::new("alice", "a.sqlite"));
        let c = table.get(&RepoId::new("alice", "c.sqlite"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_lock_serializes_threads() {
        let table = Arc::new(LockTable::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let repo = RepoId::new("alice", "a.sqlite");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                let inside = Arc::clone(&inside);
                let repo = repo.clone();
                thread::spawn(move || {
                    let lock = table.get(&repo);
                    let _guard = lock.lock();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    thread::yield_now();
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
