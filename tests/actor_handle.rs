// tests/actor_handle.rs

mod common;
use crate::common::*;

use std::error::Error;
use std::sync::Arc;

use bootqueue::db::MemDb;
use bootqueue::engine::SchedulerHandle;
use bootqueue::errors::QueueError;
use bootqueue::ids::JobId;
use bootqueue::state::{Job, Parser, RawJob, Scheduler, SchedulerOptions};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn handle_serves_the_scenario() -> TestResult {
    init_tracing();
    let ledger = Ledger::new();
    let (_db, scheduler) = mem_scheduler(&ledger);
    let (handle, task) = SchedulerHandle::spawn(scheduler);

    with_timeout(async {
        let job = TestJob::root(b"job1", &ledger);
        let id = job.id();

        assert!(!handle.has_runnable_job().await?);
        handle.put_job(job.clone()).await?;
        assert_eq!(handle.pending_jobs().await?, 1);
        assert!(handle.has_job(id).await?);
        assert_eq!(handle.get_job(id).await?, job);

        handle.add_runnable_job(id).await?;
        assert_eq!(handle.runnable_job_ids().await?, vec![id]);
        assert_eq!(handle.remove_runnable_job().await?, job);
        assert!(!handle.has_job(id).await?);
        assert_eq!(handle.pending_jobs().await?, 0);
        Ok::<_, QueueError>(())
    })
    .await?;

    let scheduler = handle.shutdown(task).await?;
    assert_eq!(scheduler.pending_jobs(), 0);
    Ok(())
}

#[tokio::test]
async fn clones_share_one_scheduler() -> TestResult {
    let ledger = Ledger::new();
    let (_db, scheduler) = mem_scheduler(&ledger);
    let (handle, task) = SchedulerHandle::spawn(scheduler);

    let mut workers = Vec::new();
    for i in 0..8u8 {
        let handle = handle.clone();
        let job = TestJob::root(&[i], &ledger);
        workers.push(tokio::spawn(async move {
            handle.put_job(job.clone()).await?;
            handle.add_runnable_job(job.id()).await?;
            handle.add_missing_job_ids(vec![JobId::from_content(&[i, i])]).await
        }));
    }
    for worker in workers {
        worker.await??;
    }

    assert_eq!(handle.pending_jobs().await?, 8);
    assert_eq!(handle.num_missing_job_ids().await?, 8);
    assert_eq!(handle.runnable_job_ids().await?.len(), 8);

    handle.clear().await?;
    assert_eq!(handle.pending_jobs().await?, 0);
    assert!(handle.missing_job_ids().await?.is_empty());

    handle.shutdown(task).await?;
    Ok(())
}

#[tokio::test]
async fn dependencies_and_caching_through_the_handle() -> TestResult {
    let ledger = Ledger::new();
    let (_db, scheduler) = mem_scheduler(&ledger);
    let (handle, task) = SchedulerHandle::spawn(scheduler);

    let d = JobId::from_content(b"d");
    let x = JobId::from_content(b"x");
    handle.add_dependency(d, x).await?;
    handle.disable_caching().await?;
    assert_eq!(handle.remove_dependencies(d).await?, vec![x]);
    assert!(handle.remove_dependencies(d).await?.is_empty());

    let a = JobId::from_content(b"a");
    handle.add_missing_job_ids(vec![a]).await?;
    handle.remove_missing_job_ids(vec![a]).await?;
    assert_eq!(handle.num_missing_job_ids().await?, 0);

    let scheduler = handle.shutdown(task).await?;
    assert!(!scheduler.caching_enabled());
    Ok(())
}

#[tokio::test]
async fn errors_come_back_through_the_reply() -> TestResult {
    let ledger = Ledger::new();
    let (_db, scheduler) = mem_scheduler(&ledger);
    let (handle, task) = SchedulerHandle::spawn(scheduler);

    let err = handle.remove_runnable_job().await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");

    // The actor keeps serving after an error.
    assert_eq!(handle.pending_jobs().await?, 0);

    handle.shutdown(task).await?;
    Ok(())
}

/// Decodes nothing; any store read takes the actor down.
struct PanickingParser;

impl Parser for PanickingParser {
    type Job = RawJob;

    fn parse(&self, _bytes: &[u8]) -> bootqueue::errors::Result<RawJob> {
        panic!("parser blew up");
    }
}

#[tokio::test]
async fn dead_actor_reports_closed() -> TestResult {
    let options = SchedulerOptions {
        caching: false,
        ..SchedulerOptions::default()
    };
    let scheduler = Scheduler::open(Arc::new(MemDb::new()), PanickingParser, &options, None)?;
    let (handle, task) = SchedulerHandle::spawn(scheduler);

    let job = RawJob::new(b"payload".to_vec());
    handle.put_job(job.clone()).await?;

    let err = handle.get_job(job.id()).await.unwrap_err();
    assert!(matches!(err, QueueError::SchedulerClosed), "got {err:?}");
    assert!(task.await.is_err(), "worker should have panicked");

    let err = handle.pending_jobs().await.unwrap_err();
    assert!(matches!(err, QueueError::SchedulerClosed), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn execute_runs_the_driver_on_the_worker() -> TestResult {
    let ledger = Ledger::new();
    let (_db, scheduler) = mem_scheduler(&ledger);
    let (handle, task) = SchedulerHandle::spawn(scheduler);

    let chain = chain(&ledger, 4);
    for job in chain.iter().rev() {
        handle.put_job(job.clone()).await?;
    }
    handle.add_runnable_job(chain[0].id()).await?;
    for pair in chain.windows(2) {
        handle.add_dependency(pair[0].id(), pair[1].id()).await?;
    }

    let executor = RecordingExecutor::new(ledger.clone());
    assert_eq!(handle.execute(executor.clone(), Some(3), 1).await?, 3);
    assert_eq!(ledger.len(), 3);
    assert_eq!(handle.pending_jobs().await?, 1);
    assert_eq!(handle.runnable_job_ids().await?, vec![chain[3].id()]);

    assert_eq!(handle.execute(executor, None, 1).await?, 1);
    assert!(ledger.is_executed(&chain[3].id()));
    assert_eq!(handle.pending_jobs().await?, 0);

    handle.shutdown(task).await?;
    Ok(())
}
