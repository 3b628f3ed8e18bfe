// src/engine/jobs.rs

//! Bootstrap driver: pushes fetched jobs and executes them in dependency
//! order.

use std::time::Instant;

use tracing::{debug, info};

use crate::errors::Result;
use crate::state::{Job, Parser, Scheduler};

/// Applies a dequeued job to chain state.
///
/// Once `execute` returns `Ok`, the job's own
/// [`missing_dependencies`](Job::missing_dependencies) must no longer be
/// reported by the jobs that depend on it.
pub trait Executor<J> {
    fn execute(&mut self, job: &J) -> Result<()>;
}

impl<J, F> Executor<J> for F
where
    F: FnMut(&J) -> Result<()>,
{
    fn execute(&mut self, job: &J) -> Result<()> {
        self(job)
    }
}

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 2500;

#[derive(Debug)]
pub struct Jobs<P: Parser> {
    scheduler: Scheduler<P>,
    progress_interval: u64,
}

impl<P: Parser> Jobs<P> {
    pub fn new(scheduler: Scheduler<P>, progress_interval: u64) -> Self {
        Self {
            scheduler,
            progress_interval: progress_interval.max(1),
        }
    }

    pub fn scheduler(&self) -> &Scheduler<P> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<P> {
        &mut self.scheduler
    }

    pub fn into_inner(self) -> Scheduler<P> {
        self.scheduler
    }

    pub fn pending_jobs(&self) -> u64 {
        self.scheduler.pending_jobs()
    }

    /// Store `job` and either queue it or park it behind its missing
    /// dependencies. Returns `false` if the job was already stored.
    pub fn push(&mut self, job: P::Job) -> Result<bool> {
        let id = job.id();
        if self.scheduler.has_job(&id)? {
            debug!(job = ?id, "job already queued; ignoring push");
            return Ok(false);
        }

        let missing = job.missing_dependencies()?;
        self.scheduler.put_job(job)?;

        if missing.is_empty() {
            self.scheduler.add_runnable_job(id)?;
        } else {
            for dependency in &missing {
                self.scheduler.add_dependency(*dependency, id)?;
            }
            debug!(job = ?id, missing = missing.len(), "job waiting on dependencies");
        }
        Ok(true)
    }

    /// Drain the runnable queue, executing jobs and releasing their
    /// dependents as they become runnable. Returns how many jobs ran.
    pub fn execute_all<E>(&mut self, executor: &mut E) -> Result<u64>
    where
        E: Executor<P::Job> + ?Sized,
    {
        self.execute(executor, None)
    }

    /// Like [`execute_all`](Self::execute_all) but stops after `limit` jobs.
    /// Jobs left runnable stay queued.
    pub fn execute_up_to<E>(&mut self, executor: &mut E, limit: u64) -> Result<u64>
    where
        E: Executor<P::Job> + ?Sized,
    {
        self.execute(executor, Some(limit))
    }

    fn execute<E>(&mut self, executor: &mut E, limit: Option<u64>) -> Result<u64>
    where
        E: Executor<P::Job> + ?Sized,
    {
        let started = Instant::now();
        let mut executed = 0u64;

        while limit.is_none_or(|limit| executed < limit) && self.scheduler.has_runnable_job()? {
            let job = self.scheduler.remove_runnable_job()?;
            let id = job.id();
            executor.execute(&job)?;
            executed += 1;

            for dependent in self.scheduler.remove_dependencies(id)? {
                let waiting = self.scheduler.get_job(&dependent)?;
                if waiting.missing_dependencies()?.is_empty() {
                    self.scheduler.add_runnable_job(dependent)?;
                }
            }

            if executed % self.progress_interval == 0 {
                info!(
                    executed,
                    pending = self.scheduler.pending_jobs(),
                    "executing bootstrap jobs"
                );
            }
        }

        info!(
            executed,
            pending = self.scheduler.pending_jobs(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished executing runnable jobs"
        );
        Ok(executed)
    }
}
