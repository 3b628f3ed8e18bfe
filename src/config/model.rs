// src/config/model.rs

use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::DEFAULT_PROGRESS_INTERVAL;
use crate::state::{DEFAULT_DEPENDENTS_CACHE_SIZE, DEFAULT_JOBS_CACHE_SIZE, SchedulerOptions};

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [store]
/// path = "bootstrap.db"
/// sync = false
///
/// [cache]
/// enabled = true
/// jobs = 2048
/// dependents = 1024
///
/// [metrics]
/// namespace = "bootstrap"
///
/// [execution]
/// progress_interval = 2500
/// ```
///
/// All sections are optional. Convert into [`ConfigFile`] with `TryFrom`,
/// which runs validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub execution: ExecutionSection,
}

/// `[store]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Log file backing the store. `None` keeps everything in memory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// fsync after every appended record.
    #[serde(default)]
    pub sync: bool,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Capacity of the parsed-job cache.
    #[serde(default = "default_jobs_cache")]
    pub jobs: usize,

    /// Capacity of the dependents handle cache.
    #[serde(default = "default_dependents_cache")]
    pub dependents: usize,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_jobs_cache() -> usize {
    DEFAULT_JOBS_CACHE_SIZE
}

fn default_dependents_cache() -> usize {
    DEFAULT_DEPENDENTS_CACHE_SIZE
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            jobs: default_jobs_cache(),
            dependents: default_dependents_cache(),
        }
    }
}

/// `[metrics]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Prefix of every exported metric name.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "bootstrap".to_string()
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

/// `[execution]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionSection {
    /// Log a progress line every this many executed jobs.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_progress_interval() -> u64 {
    DEFAULT_PROGRESS_INTERVAL
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
        }
    }
}

/// Validated configuration. Only constructed through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub store: StoreSection,
    pub cache: CacheSection,
    pub metrics: MetricsSection,
    pub execution: ExecutionSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            store: raw.store,
            cache: raw.cache,
            metrics: raw.metrics,
            execution: raw.execution,
        }
    }

    /// Scheduler construction options derived from `[cache]` and `[metrics]`.
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            caching: self.cache.enabled,
            jobs_cache_size: NonZeroUsize::new(self.cache.jobs).unwrap_or(NonZeroUsize::MIN),
            dependents_cache_size: NonZeroUsize::new(self.cache.dependents)
                .unwrap_or(NonZeroUsize::MIN),
            metrics_namespace: self.metrics.namespace.clone(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}
