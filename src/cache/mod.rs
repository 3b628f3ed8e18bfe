// src/cache/mod.rs

//! Bounded LRU caches owned by a scheduler instance.
//!
//! Caches never hold authoritative state: everything in them can be rebuilt
//! from the store, and flushing them only changes which code path serves a
//! read.

pub mod metrics;

use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::trace;

pub use metrics::CacheMetrics;

pub struct Cache<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    metrics: Option<CacheMetrics>,
}

impl<K: Hash + Eq, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("len", &self.entries.len())
            .field("cap", &self.entries.cap())
            .field("metered", &self.metrics.is_some())
            .finish()
    }
}

impl<K: Hash + Eq, V> Cache<K, V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            metrics: None,
        }
    }

    /// Cache that reports hits, misses and size through `metrics`.
    pub fn metered(capacity: NonZeroUsize, metrics: CacheMetrics) -> Self {
        Self {
            entries: LruCache::new(capacity),
            metrics: Some(metrics),
        }
    }

    /// Look up `key`, marking it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let hit = self.entries.contains(key);
        if let Some(m) = &self.metrics {
            m.record_lookup(hit);
        }
        if hit {
            trace!("cache hit");
        }
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let hit = self.entries.contains(key);
        if let Some(m) = &self.metrics {
            m.record_lookup(hit);
        }
        self.entries.get_mut(key)
    }

    /// Whether `key` is cached. Does not touch recency or metrics.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    pub fn put(&mut self, key: K, value: V) {
        self.entries.put(key, value);
        self.update_len();
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.pop(key);
        self.update_len();
        removed
    }

    pub fn flush(&mut self) {
        self.entries.clear();
        self.update_len();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn metrics(&self) -> Option<&CacheMetrics> {
        self.metrics.as_ref()
    }

    fn update_len(&self) {
        if let Some(m) = &self.metrics {
            m.set_len(self.entries.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = Cache::new(cap(2));
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.get(&"a"), Some(&1));
        cache.put("c", 3);

        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn flush_empties_cache() {
        let mut cache = Cache::new(cap(4));
        cache.put(1u8, "x");
        cache.put(2u8, "y");
        cache.flush();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }
}
