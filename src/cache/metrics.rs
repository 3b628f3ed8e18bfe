// src/cache/metrics.rs

//! Prometheus counters for cache effectiveness.

use std::fmt;

use prometheus::{IntCounter, IntGauge, Registry};

use crate::errors::Result;

/// Hit / miss / size metrics of one cache, registered under `<namespace>_*`.
#[derive(Clone)]
pub struct CacheMetrics {
    namespace: String,
    hits: IntCounter,
    misses: IntCounter,
    len: IntGauge,
}

impl fmt::Debug for CacheMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheMetrics")
            .field("namespace", &self.namespace)
            .field("hits", &self.hits.get())
            .field("misses", &self.misses.get())
            .field("len", &self.len.get())
            .finish()
    }
}

impl CacheMetrics {
    /// Create the metrics and register them on `registry`.
    ///
    /// Fails if a cache with the same namespace is already registered.
    pub fn register(namespace: &str, registry: &Registry) -> Result<Self> {
        let hits = IntCounter::new(
            format!("{namespace}_hits_total"),
            "Number of cache lookups served from the cache",
        )?;
        let misses = IntCounter::new(
            format!("{namespace}_misses_total"),
            "Number of cache lookups that fell through to the store",
        )?;
        let len = IntGauge::new(
            format!("{namespace}_len"),
            "Number of entries currently cached",
        )?;

        registry.register(Box::new(hits.clone()))?;
        registry.register(Box::new(misses.clone()))?;
        registry.register(Box::new(len.clone()))?;

        Ok(Self {
            namespace: namespace.to_string(),
            hits,
            misses,
            len,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    pub fn len(&self) -> i64 {
        self.len.get()
    }

    pub(crate) fn record_lookup(&self, hit: bool) {
        if hit {
            self.hits.inc();
        } else {
            self.misses.inc();
        }
    }

    pub(crate) fn set_len(&self, len: usize) {
        self.len.set(i64::try_from(len).unwrap_or(i64::MAX));
    }
}
