//! Keyed async mutexes
//!
//! One `tokio::sync::Mutex` per key, created on first use and kept in a
//! `DashMap`. Used to make "check balance, then mutate balance" atomic per
//! account, and "check status, then resolve" atomic per transaction.
//!
//! An entry lives only while some task holds or waits on it. The last guard
//! to drop removes it, so the map tracks contended keys, not every key ever
//! locked.

use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Entries<K> = Arc<DashMap<K, Arc<Mutex<()>>>>;

/// A set of named critical sections
#[derive(Debug)]
pub struct KeyedLocks<K: Eq + Hash> {
    entries: Entries<K>,
}

/// Guard for a single key; the lock is released on drop
pub struct KeyGuard<K: Eq + Hash> {
    guard: Option<OwnedMutexGuard<()>>,
    key: K,
    entries: Entries<K>,
}

impl<K: Eq + Hash> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        // Unlock first: an idle entry is one only the map still owns
        self.guard.take();
        self.entries
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for KeyGuard<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard").field("key", &self.key).finish()
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    fn mutex_for(&self, key: K) -> Arc<Mutex<()>> {
        // The map guard is dropped at the end of this statement, before any await
        Arc::clone(&*self.entries.entry(key).or_default())
    }

    /// Acquire the lock for one key
    pub async fn lock(&self, key: K) -> KeyGuard<K> {
        let guard = self.mutex_for(key.clone()).lock_owned().await;
        KeyGuard {
            guard: Some(guard),
            key,
            entries: Arc::clone(&self.entries),
        }
    }

    /// Acquire the locks for several keys.
    ///
    /// Keys are sorted and deduplicated first, so every caller acquires in the
    /// same global order and two callers locking the same pair can't deadlock.
    pub async fn lock_all(&self, keys: &[K]) -> Vec<KeyGuard<K>> {
        let mut ordered: Vec<K> = keys.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for key in ordered {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Number of keys currently held or waited on
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
