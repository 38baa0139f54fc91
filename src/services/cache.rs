//! Bounded in-memory caches.
//!
//! [`BoundedCache`] is a key/value map with time-to-live and a maximum entry
//! count, evicted in two passes: expired entries first, then the least
//! recently accessed entries until the map fits. [`CountBoundedLists`] holds
//! list-valued entries with no per-item timestamp and is bounded by count
//! only, dropping the oldest-inserted keys first.
//!
//! Neither type locks; owners wrap them in a mutex (see
//! [`BoundedCacheStore`](crate::services::cache_store::BoundedCacheStore)).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Cache entry with last-access bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub last_accessed: Instant,
    /// Monotonic access counter, breaks ties between equal instants.
    access_seq: u64,
}

impl<V> CacheEntry<V> {
    fn new(value: V, now: Instant, seq: u64) -> Self {
        Self {
            value,
            last_accessed: now,
            access_seq: seq,
        }
    }

    fn touch(&mut self, now: Instant, seq: u64) {
        self.last_accessed = now;
        self.access_seq = seq;
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_accessed) > ttl
    }

    fn recency(&self) -> (Instant, u64) {
        (self.last_accessed, self.access_seq)
    }
}

/// Hit/miss/eviction counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl std::ops::AddAssign for CacheCounters {
    fn add_assign(&mut self, other: Self) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.evictions += other.evictions;
    }
}

/// Result of one eviction pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvictionOutcome {
    /// Removed because `now - last_accessed > ttl`.
    pub expired: usize,
    /// Removed by the least-recently-used pass.
    pub overflow: usize,
}

impl EvictionOutcome {
    pub fn total(&self) -> usize {
        self.expired + self.overflow
    }
}

impl std::ops::AddAssign for EvictionOutcome {
    fn add_assign(&mut self, other: Self) {
        self.expired += other.expired;
        self.overflow += other.overflow;
    }
}

/// Key/value cache bounded by TTL and entry count
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    max_entries: usize,
    ttl: Duration,
    entries: HashMap<K, CacheEntry<V>>,
    next_seq: u64,
    counters: CacheCounters,
}

impl<K, V> BoundedCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a new cache. `max_entries` is raised to at least 1.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries: max_entries.max(1),
            ttl,
            entries: HashMap::new(),
            next_seq: 0,
            counters: CacheCounters::default(),
        }
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Get a value, refreshing its last-access time
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now, self.ttl),
            None => {
                self.counters.misses += 1;
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.counters.evictions += 1;
            self.counters.misses += 1;
            return None;
        }

        let seq = self.bump_seq();
        self.counters.hits += 1;
        self.entries.get_mut(key).map(|entry| {
            entry.touch(now, seq);
            entry.value.clone()
        })
    }

    /// Read a value without counting it as an access
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Insert or replace a value, stamping its last-access time
    pub fn set(&mut self, key: K, value: V) {
        self.set_at(key, value, Instant::now());
    }

    pub fn set_at(&mut self, key: K, value: V, now: Instant) {
        let seq = self.bump_seq();
        self.entries.insert(key, CacheEntry::new(value, now, seq));
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn counters(&self) -> CacheCounters {
        self.counters
    }

    /// Run an eviction pass against the current time
    pub fn evict(&mut self) -> EvictionOutcome {
        self.evict_at(Instant::now())
    }

    /// Run an eviction pass as of `now`
    ///
    /// After this returns, `len() <= max_entries` and no retained entry has
    /// been idle for longer than the TTL.
    pub fn evict_at(&mut self, now: Instant) -> EvictionOutcome {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now, ttl));
        let expired = before - self.entries.len();

        let mut overflow = 0;
        if self.entries.len() > self.max_entries {
            let mut by_recency: Vec<(K, (Instant, u64))> = self
                .entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.recency()))
                .collect();
            by_recency.sort_by_key(|(_, recency)| *recency);

            overflow = self.entries.len() - self.max_entries;
            for (key, _) in by_recency.into_iter().take(overflow) {
                self.entries.remove(&key);
            }
        }

        let outcome = EvictionOutcome { expired, overflow };
        self.counters.evictions += outcome.total() as u64;
        outcome
    }
}

/// List-valued map bounded by key count and list length
///
/// Items carry no timestamp, so eviction drops whole keys in insertion order.
#[derive(Debug)]
pub struct CountBoundedLists<K, T> {
    max_keys: usize,
    max_items_per_key: usize,
    order: VecDeque<K>,
    lists: HashMap<K, Vec<T>>,
    evictions: u64,
}

impl<K, T> CountBoundedLists<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    pub fn new(max_keys: usize, max_items_per_key: usize) -> Self {
        Self {
            max_keys: max_keys.max(1),
            max_items_per_key: max_items_per_key.max(1),
            order: VecDeque::new(),
            lists: HashMap::new(),
            evictions: 0,
        }
    }

    /// Append items to a key's list, dropping its oldest items past the per-key cap
    pub fn extend<I>(&mut self, key: K, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        if !self.lists.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        let list = self.lists.entry(key).or_default();
        list.extend(items);
        if list.len() > self.max_items_per_key {
            let excess = list.len() - self.max_items_per_key;
            list.drain(..excess);
        }
    }

    /// Replace a key's list. Existing keys keep their insertion position.
    pub fn replace(&mut self, key: K, mut items: Vec<T>) {
        if items.len() > self.max_items_per_key {
            let excess = items.len() - self.max_items_per_key;
            items.drain(..excess);
        }
        if self.lists.insert(key.clone(), items).is_none() {
            self.order.push_back(key);
        }
    }

    pub fn get(&self, key: &K) -> Option<&[T]> {
        self.lists.get(key).map(|list| list.as_slice())
    }

    pub fn remove(&mut self, key: &K) -> Option<Vec<T>> {
        let removed = self.lists.remove(key);
        if removed.is_some() {
            self.order.retain(|k| k != key);
        }
        removed
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Total number of items across all keys
    pub fn item_count(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.lists.clear();
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Drop the oldest-inserted keys until at most `max_keys` remain
    pub fn evict(&mut self) -> usize {
        let mut removed = 0;
        while self.lists.len() > self.max_keys {
            match self.order.pop_front() {
                Some(key) => {
                    if self.lists.remove(&key).is_some() {
                        removed += 1;
                    }
                }
                None => break,
            }
        }
        self.evictions += removed as u64;
        removed
    }
}
