// src/state/mod.rs

//! Persistent scheduling state for bootstrapping.
//!
//! - [`jobs`]: job id -> serialized job, with a content cache.
//! - [`dependencies`]: dependency id -> jobs blocked on it.
//! - [`runnable`]: ids ready for execution, oldest first.
//! - [`missing`]: ids depended upon but not present locally.
//! - [`pending`]: checkpointed count of jobs awaiting execution.
//!
//! [`Scheduler`] composes them into the operation set used by the bootstrap
//! engine.

pub mod dependencies;
pub mod job;
pub mod jobs;
pub mod missing;
pub mod pending;
pub mod runnable;

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use prometheus::Registry;
use tracing::{debug, info};

use crate::cache::{Cache, CacheMetrics};
use crate::db::{Batch, Database, PrefixDb};
use crate::errors::{QueueError, Result};
use crate::ids::JobId;

pub use dependencies::DependencyGraph;
pub use job::{Job, Parser, RawJob, RawParser};
pub use jobs::JobStore;
pub use missing::MissingSet;
pub use pending::PendingCounter;
pub use runnable::RunnableQueue;

pub const RUNNABLE_PREFIX: &[u8] = b"runnable";
pub const JOBS_PREFIX: &[u8] = b"jobs";
pub const DEPENDENCIES_PREFIX: &[u8] = b"dependencies";
pub const MISSING_PREFIX: &[u8] = b"missing job IDs";
pub const PENDING_PREFIX: &[u8] = b"pendingJobs";

pub const DEFAULT_JOBS_CACHE_SIZE: usize = 2048;
pub const DEFAULT_DEPENDENTS_CACHE_SIZE: usize = 1024;

/// Construction-time knobs for a [`Scheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Start with caching enabled. Turning it off later is one-way.
    pub caching: bool,
    pub jobs_cache_size: NonZeroUsize,
    pub dependents_cache_size: NonZeroUsize,
    /// Prefix for cache metric names when a registry is supplied.
    pub metrics_namespace: String,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            caching: true,
            jobs_cache_size: NonZeroUsize::new(DEFAULT_JOBS_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            dependents_cache_size: NonZeroUsize::new(DEFAULT_DEPENDENTS_CACHE_SIZE)
                .unwrap_or(NonZeroUsize::MIN),
            metrics_namespace: "bootstrap".to_string(),
        }
    }
}

/// Crash-recoverable, dependency-ordered job queue over a key-value store.
///
/// The scheduler does no internal locking. Mutating operations take
/// `&mut self`, so a single owner drives it; callers that need to reach it
/// from several tasks either put it behind one mutex covering the whole
/// operation surface or go through a
/// [`SchedulerHandle`](crate::engine::SchedulerHandle).
///
/// Missing Set membership and Dependency Graph consistency are the caller's
/// responsibility; the scheduler only keeps the books.
pub struct Scheduler<P: Parser> {
    root: Arc<dyn Database>,
    jobs: JobStore<P>,
    dependencies: DependencyGraph,
    runnable: RunnableQueue,
    missing: MissingSet,
    pending: PendingCounter,
}

impl<P: Parser> fmt::Debug for Scheduler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending.get())
            .field("caching", &self.jobs.caching())
            .field("cached_jobs", &self.jobs.cached_len())
            .field("cached_handles", &self.dependencies.cached_handles())
            .finish_non_exhaustive()
    }
}

impl<P: Parser> Scheduler<P> {
    /// Open the scheduler state stored in `db`.
    ///
    /// With a `registry`, both caches register hit / miss / size metrics
    /// under `<metrics_namespace>_jobs_cache` and
    /// `<metrics_namespace>_dependents_cache`.
    pub fn open(
        db: Arc<dyn Database>,
        parser: P,
        options: &SchedulerOptions,
        registry: Option<&Registry>,
    ) -> Result<Self> {
        let (jobs_cache, handle_cache) = match registry {
            Some(registry) => {
                let ns = &options.metrics_namespace;
                let jobs_metrics = CacheMetrics::register(&format!("{ns}_jobs_cache"), registry)?;
                let handle_metrics =
                    CacheMetrics::register(&format!("{ns}_dependents_cache"), registry)?;
                (
                    Cache::metered(options.jobs_cache_size, jobs_metrics),
                    Cache::metered(options.dependents_cache_size, handle_metrics),
                )
            }
            None => (
                Cache::new(options.jobs_cache_size),
                Cache::new(options.dependents_cache_size),
            ),
        };

        let jobs = JobStore::new(PrefixDb::new(Arc::clone(&db), JOBS_PREFIX), parser, jobs_cache);
        let pending = PendingCounter::open(PrefixDb::new(Arc::clone(&db), PENDING_PREFIX), &jobs)?;
        let dependencies =
            DependencyGraph::new(PrefixDb::new(Arc::clone(&db), DEPENDENCIES_PREFIX), handle_cache);
        let runnable = RunnableQueue::open(PrefixDb::new(Arc::clone(&db), RUNNABLE_PREFIX))?;
        let missing = MissingSet::open(PrefixDb::new(Arc::clone(&db), MISSING_PREFIX))?;

        let mut scheduler = Self {
            root: db,
            jobs,
            dependencies,
            runnable,
            missing,
            pending,
        };
        if !options.caching {
            scheduler.disable_caching();
        }

        info!(
            pending = scheduler.pending.get(),
            caching = options.caching,
            "scheduler state opened"
        );
        Ok(scheduler)
    }

    /// Number of jobs resident and not yet executed.
    pub fn pending_jobs(&self) -> u64 {
        self.pending.get()
    }

    /// Persist `job` and checkpoint the incremented pending count, atomically.
    pub fn put_job(&mut self, job: P::Job) -> Result<()> {
        let id = job.id();
        let mut batch = Batch::new();
        self.jobs.stage_put(&mut batch, &job);
        let pending = self.pending.stage_increment(&mut batch);
        self.root.write_batch(batch)?;

        self.pending.commit(pending);
        self.jobs.cache_put(job);
        debug!(job = ?id, pending, "stored job");
        Ok(())
    }

    pub fn has_job(&self, id: &JobId) -> Result<bool> {
        self.jobs.has(id)
    }

    pub fn get_job(&mut self, id: &JobId) -> Result<P::Job> {
        self.jobs.get(id)
    }

    pub fn add_runnable_job(&mut self, id: JobId) -> Result<()> {
        let queued = self.runnable.push(id)?;
        debug!(job = ?id, queued, "added runnable job");
        Ok(())
    }

    pub fn has_runnable_job(&self) -> Result<bool> {
        Ok(!self.runnable.is_empty()?)
    }

    /// Ids currently queued as runnable, head first.
    pub fn runnable_job_ids(&self) -> Result<Vec<JobId>> {
        self.runnable.ids()
    }

    /// Pop the head of the runnable queue, delete its job and return it.
    ///
    /// An empty queue yields [`QueueError::NotFound`]. Once the head entry is
    /// gone, a failed lookup or delete is reported as
    /// [`QueueError::Dequeue`]: queue and job store disagree and the caller
    /// must escalate rather than retry.
    pub fn remove_runnable_job(&mut self) -> Result<P::Job> {
        let head = self.runnable.pop_head()?;
        let job_id = JobId::from_slice(&head)?;
        let dequeue_failed = |source: QueueError| QueueError::Dequeue {
            job_id,
            source: Box::new(source),
        };

        let job = self.jobs.get(&job_id).map_err(dequeue_failed)?;

        let mut batch = Batch::new();
        self.jobs.stage_delete(&mut batch, &job_id);
        let pending = self.pending.stage_decrement(&mut batch);
        self.root.write_batch(batch).map_err(dequeue_failed)?;

        self.jobs.evict(&job_id);
        self.pending.commit(pending);
        debug!(job = ?job_id, pending, "dequeued runnable job");
        Ok(job)
    }

    /// Record that `dependent` cannot run before `dependency` has.
    pub fn add_dependency(&mut self, dependency: JobId, dependent: JobId) -> Result<()> {
        self.dependencies.add(dependency, dependent)
    }

    /// Remove and return every job blocked on `dependency`, each once.
    ///
    /// All-or-nothing: on error no dependent has been removed.
    pub fn remove_dependencies(&mut self, dependency: JobId) -> Result<Vec<JobId>> {
        self.dependencies.remove_all(dependency)
    }

    pub fn add_missing_job_ids(&mut self, ids: impl IntoIterator<Item = JobId>) -> Result<()> {
        self.missing.add(ids)
    }

    pub fn remove_missing_job_ids(&mut self, ids: impl IntoIterator<Item = JobId>) -> Result<()> {
        self.missing.remove(ids)
    }

    pub fn missing_job_ids(&self) -> Result<Vec<JobId>> {
        self.missing.ids()
    }

    pub fn num_missing_job_ids(&self) -> Result<usize> {
        self.missing.len()
    }

    /// Flush both caches and bypass them from now on. There is no way back.
    pub fn disable_caching(&mut self) {
        self.dependencies.disable_caching();
        self.jobs.disable_caching();
        debug!("scheduler caching disabled");
    }

    pub fn caching_enabled(&self) -> bool {
        self.jobs.caching()
    }

    /// Delete all scheduler state in one batch and reset the pending count.
    pub fn clear(&mut self) -> Result<()> {
        let mut batch = Batch::new();
        let mut removed = 0;
        removed += self.runnable.stage_clear(&mut batch)?;
        removed += self.jobs.stage_clear(&mut batch)?;
        removed += self.dependencies.stage_clear(&mut batch)?;
        removed += self.missing.stage_clear(&mut batch)?;
        self.pending.stage_reset(&mut batch);
        self.root.write_batch(batch)?;

        self.jobs.flush_cache();
        self.dependencies.flush_handles();
        self.runnable.reload()?;
        self.missing.reload()?;
        self.pending.commit(0);
        info!(removed, "cleared scheduler state");
        Ok(())
    }
}
