//! Fixed-capacity FIFO cache for ranked hit lists.
//!
//! Keys are evicted in insertion order, not access order: reading an
//! entry never refreshes it. Re-inserting an existing key replaces the
//! value in place and keeps its original position in the queue.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use crate::error::SearchError;
use crate::types::Hit;

/// Cache of ranked hits keyed by normalized query text.
pub type HitCache = FifoCache<String, Vec<Hit>>;

/// A bounded map that evicts the oldest inserted key when full.
#[derive(Debug, Clone)]
pub struct FifoCache<K, V> {
    capacity: usize,
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    evictions: u64,
}

impl<K, V> FifoCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty cache holding at most `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, SearchError> {
        if capacity == 0 {
            return Err(SearchError::Config(
                "cache capacity must be greater than 0".into(),
            ));
        }
        Ok(Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            evictions: 0,
        })
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace `key`.
    ///
    /// Returns the entry evicted to make room, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                evicted = self.entries.remove(&oldest).map(|v| (oldest, v));
                self.evictions += 1;
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of entries evicted since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Keys from oldest to newest.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    /// Drop every entry. The eviction counter is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
