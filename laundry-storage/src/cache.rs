//! Bounded read cache with FIFO eviction.
//!
//! Eviction is strictly by insertion order: lookups never refresh a key's
//! position, and overwriting a live key keeps its original slot. Insertion
//! order is tracked in a queue next to the map, so eviction is O(1) and does
//! not depend on the map's iteration order.

use laundry_core::cost::{units, CostAccountant, CostMeter};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Consumer name the cache charges cost under.
pub const CONSUMER: &str = "ReadCache";

/// Default number of entries.
pub const DEFAULT_CAPACITY: usize = 64;

struct CacheState<V> {
    entries: HashMap<String, V>,
    /// Live keys, oldest first.
    order: VecDeque<String>,
}

/// String-keyed cache holding at most `capacity` values.
pub struct ReadCache<V> {
    state: RwLock<CacheState<V>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    meter: CostMeter,
}

impl<V: Clone> ReadCache<V> {
    /// Creates a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize, accountant: Arc<CostAccountant>) -> Self {
        let meter = CostMeter::new(accountant, CONSUMER);
        meter.charge(units::CONNECTION);
        let capacity = capacity.max(1);
        Self {
            state: RwLock::new(CacheState {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            meter,
        }
    }

    /// Creates a cache with the default capacity.
    pub fn with_default_capacity(accountant: Arc<CostAccountant>) -> Self {
        Self::new(DEFAULT_CAPACITY, accountant)
    }

    /// Looks up `key`. Only misses are charged.
    pub fn get(&self, key: &str) -> Option<V> {
        let found = self.state.read().entries.get(key).cloned();
        match found {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("cache hit for {}", key);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.meter.charge(units::CACHE_READ);
                tracing::debug!("cache miss for {}", key);
                None
            }
        }
    }

    /// Inserts or overwrites `key`. A new key evicts the oldest entry when full.
    pub fn put(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        {
            let mut state = self.state.write();
            if !state.entries.contains_key(&key) {
                if state.entries.len() >= self.capacity {
                    if let Some(oldest) = state.order.pop_front() {
                        state.entries.remove(&oldest);
                        tracing::debug!("cache evicted {}", oldest);
                    }
                }
                state.order.push_back(key.clone());
            }
            state.entries.insert(key, value);
        }
        self.meter.charge(units::CACHE_WRITE);
    }

    /// Returns true if `key` is cached. Not counted and not charged.
    pub fn contains(&self, key: &str) -> bool {
        self.state.read().entries.contains_key(key)
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of lookups that hit.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of lookups that missed.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns hits / lookups, or 0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
