//! Keyed mutual exclusion for read-modify-write cycles on stored files.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registry of one lock per key. Holders of different keys never contend.
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Copy> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get the lock for `key`, creating it on first use
    pub fn get(&self, key: K) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }

    /// Forget the lock for a key that no longer exists on disk
    pub fn remove(&self, key: &K) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.remove(key);
    }
}

impl<K: Eq + Hash + Copy> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Acquire a lock handed out by [`KeyedLocks::get`]. The guarded value is
/// `()`, so a poisoned lock carries no broken invariant and is recovered.
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}
