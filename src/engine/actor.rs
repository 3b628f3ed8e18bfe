// src/engine/actor.rs

//! Single-owner actor around a [`Scheduler`].
//!
//! The scheduler moves onto a blocking worker thread that serves one command
//! at a time from an mpsc channel. Every operation is therefore serialized
//! by construction, and async callers (network handlers reporting arrived
//! ancestors, the execution loop) can share a cloned [`SchedulerHandle`]
//! without extra locking.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::jobs::{Executor, Jobs};
use crate::errors::{QueueError, Result};
use crate::ids::JobId;
use crate::state::{Parser, Scheduler};

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command<J> {
    PutJob(J, Reply<()>),
    HasJob(JobId, Reply<bool>),
    GetJob(JobId, Reply<J>),
    AddRunnableJob(JobId, Reply<()>),
    HasRunnableJob(Reply<bool>),
    RunnableJobIds(Reply<Vec<JobId>>),
    RemoveRunnableJob(Reply<J>),
    AddDependency {
        dependency: JobId,
        dependent: JobId,
        reply: Reply<()>,
    },
    RemoveDependencies(JobId, Reply<Vec<JobId>>),
    AddMissingJobIds(Vec<JobId>, Reply<()>),
    RemoveMissingJobIds(Vec<JobId>, Reply<()>),
    MissingJobIds(Reply<Vec<JobId>>),
    NumMissingJobIds(Reply<usize>),
    PendingJobs(Reply<u64>),
    DisableCaching(Reply<()>),
    Clear(Reply<()>),
    Execute {
        executor: Box<dyn Executor<J> + Send>,
        limit: Option<u64>,
        progress_interval: u64,
        reply: Reply<u64>,
    },
}

/// Cloneable async front-end to a scheduler running on its own thread.
pub struct SchedulerHandle<J> {
    tx: mpsc::Sender<Command<J>>,
}

impl<J> Clone for SchedulerHandle<J> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<J> std::fmt::Debug for SchedulerHandle<J> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Join handle of the worker; resolves once every handle is dropped.
pub type SchedulerTask<P> = JoinHandle<Scheduler<P>>;

impl<J: Send + 'static> SchedulerHandle<J> {
    /// Move `scheduler` onto a blocking worker and return a handle to it.
    ///
    /// The worker stops when the last handle is dropped and yields the
    /// scheduler back through the join handle.
    pub fn spawn<P>(scheduler: Scheduler<P>) -> (Self, SchedulerTask<P>)
    where
        P: Parser<Job = J>,
    {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::task::spawn_blocking(move || serve(scheduler, rx));
        (Self { tx }, task)
    }

    /// Drop this handle and wait for the worker to hand the scheduler back.
    ///
    /// Only returns once every other clone has been dropped too.
    pub async fn shutdown<P>(self, task: SchedulerTask<P>) -> Result<Scheduler<P>>
    where
        P: Parser<Job = J>,
    {
        drop(self);
        task.await
            .map_err(|err| QueueError::Other(anyhow::Error::new(err)))
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command<J>) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| QueueError::SchedulerClosed)?;
        reply_rx.await.map_err(|_| QueueError::SchedulerClosed)?
    }

    pub async fn put_job(&self, job: J) -> Result<()> {
        self.call(|reply| Command::PutJob(job, reply)).await
    }

    pub async fn has_job(&self, id: JobId) -> Result<bool> {
        self.call(|reply| Command::HasJob(id, reply)).await
    }

    pub async fn get_job(&self, id: JobId) -> Result<J> {
        self.call(|reply| Command::GetJob(id, reply)).await
    }

    pub async fn add_runnable_job(&self, id: JobId) -> Result<()> {
        self.call(|reply| Command::AddRunnableJob(id, reply)).await
    }

    pub async fn has_runnable_job(&self) -> Result<bool> {
        self.call(Command::HasRunnableJob).await
    }

    pub async fn runnable_job_ids(&self) -> Result<Vec<JobId>> {
        self.call(Command::RunnableJobIds).await
    }

    pub async fn remove_runnable_job(&self) -> Result<J> {
        self.call(Command::RemoveRunnableJob).await
    }

    pub async fn add_dependency(&self, dependency: JobId, dependent: JobId) -> Result<()> {
        self.call(|reply| Command::AddDependency {
            dependency,
            dependent,
            reply,
        })
        .await
    }

    pub async fn remove_dependencies(&self, dependency: JobId) -> Result<Vec<JobId>> {
        self.call(|reply| Command::RemoveDependencies(dependency, reply))
            .await
    }

    pub async fn add_missing_job_ids(&self, ids: Vec<JobId>) -> Result<()> {
        self.call(|reply| Command::AddMissingJobIds(ids, reply)).await
    }

    pub async fn remove_missing_job_ids(&self, ids: Vec<JobId>) -> Result<()> {
        self.call(|reply| Command::RemoveMissingJobIds(ids, reply))
            .await
    }

    pub async fn missing_job_ids(&self) -> Result<Vec<JobId>> {
        self.call(Command::MissingJobIds).await
    }

    pub async fn num_missing_job_ids(&self) -> Result<usize> {
        self.call(Command::NumMissingJobIds).await
    }

    pub async fn pending_jobs(&self) -> Result<u64> {
        self.call(Command::PendingJobs).await
    }

    pub async fn disable_caching(&self) -> Result<()> {
        self.call(Command::DisableCaching).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.call(Command::Clear).await
    }

    /// Run the [`Jobs`] driver on the worker, executing up to `limit` jobs
    /// (all runnable ones with `None`). Returns how many ran.
    pub async fn execute<E>(
        &self,
        executor: E,
        limit: Option<u64>,
        progress_interval: u64,
    ) -> Result<u64>
    where
        E: Executor<J> + Send + 'static,
    {
        self.call(|reply| Command::Execute {
            executor: Box::new(executor),
            limit,
            progress_interval,
            reply,
        })
        .await
    }
}

fn serve<P: Parser>(
    mut scheduler: Scheduler<P>,
    mut rx: mpsc::Receiver<Command<P::Job>>,
) -> Scheduler<P> {
    info!("scheduler actor started");
    let mut served = 0u64;

    while let Some(command) = rx.blocking_recv() {
        served += 1;
        // A caller that gave up on its reply is not an error for the actor.
        match command {
            Command::PutJob(job, reply) => {
                let _ = reply.send(scheduler.put_job(job));
            }
            Command::HasJob(id, reply) => {
                let _ = reply.send(scheduler.has_job(&id));
            }
            Command::GetJob(id, reply) => {
                let _ = reply.send(scheduler.get_job(&id));
            }
            Command::AddRunnableJob(id, reply) => {
                let _ = reply.send(scheduler.add_runnable_job(id));
            }
            Command::HasRunnableJob(reply) => {
                let _ = reply.send(scheduler.has_runnable_job());
            }
            Command::RunnableJobIds(reply) => {
                let _ = reply.send(scheduler.runnable_job_ids());
            }
            Command::RemoveRunnableJob(reply) => {
                let _ = reply.send(scheduler.remove_runnable_job());
            }
            Command::AddDependency {
                dependency,
                dependent,
                reply,
            } => {
                let _ = reply.send(scheduler.add_dependency(dependency, dependent));
            }
            Command::RemoveDependencies(dependency, reply) => {
                let _ = reply.send(scheduler.remove_dependencies(dependency));
            }
            Command::AddMissingJobIds(ids, reply) => {
                let _ = reply.send(scheduler.add_missing_job_ids(ids));
            }
            Command::RemoveMissingJobIds(ids, reply) => {
                let _ = reply.send(scheduler.remove_missing_job_ids(ids));
            }
            Command::MissingJobIds(reply) => {
                let _ = reply.send(scheduler.missing_job_ids());
            }
            Command::NumMissingJobIds(reply) => {
                let _ = reply.send(scheduler.num_missing_job_ids());
            }
            Command::PendingJobs(reply) => {
                let _ = reply.send(Ok(scheduler.pending_jobs()));
            }
            Command::DisableCaching(reply) => {
                scheduler.disable_caching();
                let _ = reply.send(Ok(()));
            }
            Command::Clear(reply) => {
                let _ = reply.send(scheduler.clear());
            }
            Command::Execute {
                mut executor,
                limit,
                progress_interval,
                reply,
            } => {
                let mut jobs = Jobs::new(scheduler, progress_interval);
                let result = match limit {
                    Some(limit) => jobs.execute_up_to(executor.as_mut(), limit),
                    None => jobs.execute_all(executor.as_mut()),
                };
                scheduler = jobs.into_inner();
                let _ = reply.send(result);
            }
        }
    }

    debug!(served, "all scheduler handles dropped");
    info!("scheduler actor stopped");
    scheduler
}
