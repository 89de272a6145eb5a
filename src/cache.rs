//! Bounded, thread-safe memo table for single-word normalization.

use log::trace;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DEFAULT_CACHE_CAPACITY: usize = 32_768;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

struct Entry {
    value: String,
    tick: u64,
}

#[derive(Default)]
struct LruState {
    entries: HashMap<String, Entry>,
    // tick -> key, oldest first
    order: BTreeMap<u64, String>,
    clock: u64,
}

impl LruState {
    fn next_tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn get(&mut self, key: &str) -> Option<String> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        self.order.remove(&entry.tick);
        entry.tick = tick;
        self.order.insert(tick, key.to_string());
        Some(entry.value.clone())
    }

    fn insert(&mut self, key: String, value: String, capacity: usize) {
        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(&key) {
            self.order.remove(&entry.tick);
            entry.tick = tick;
            entry.value = value;
            self.order.insert(tick, key);
            return;
        }

        while self.entries.len() >= capacity {
            match self.order.pop_first() {
                Some((_, oldest)) => {
                    trace!("evicting cached word {:?}", oldest);
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.insert(tick, key.clone());
        self.entries.insert(key, Entry { value, tick });
    }
}

/// Least-recently-used cache from raw word to normalized word.
///
/// Synchronization is internal; callers share it by reference. A capacity of
/// zero disables storage entirely.
pub struct WordCache {
    state: Mutex<LruState>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl WordCache {
    pub fn new(capacity: usize) -> Self {
        WordCache {
            state: Mutex::new(LruState::default()),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // The table only holds derived values, so a panic elsewhere never leaves
    // it in a state worth refusing.
    fn lock(&self) -> MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if self.capacity == 0 {
            return None;
        }
        let found = self.lock().get(key);
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn insert(&self, key: &str, value: &str) {
        if self.capacity == 0 {
            return;
        }
        self.lock()
            .insert(key.to_string(), value.to_string(), self.capacity);
    }

    /// Returns the cached value for `key`, computing and storing it on a miss.
    /// The computation runs outside the lock.
    pub fn get_or_insert_with<F>(&self, key: &str, compute: F) -> String
    where
        F: FnOnce(&str) -> String,
    {
        if let Some(hit) = self.get(key) {
            return hit;
        }
        let value = compute(key);
        self.insert(key, &value);
        value
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.len(),
            capacity: self.capacity,
        }
    }
}

impl Default for WordCache {
    fn default() -> Self {
        WordCache::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for WordCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
