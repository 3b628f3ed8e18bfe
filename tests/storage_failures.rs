// tests/storage_failures.rs

mod common;
use crate::common::*;

use std::error::Error;
use std::sync::Arc;

use bootqueue::errors::QueueError;
use bootqueue::ids::JobId;
use bootqueue::state::{Job, Scheduler};

type TestResult = Result<(), Box<dyn Error>>;

fn failing_scheduler(ledger: &Ledger) -> (FailingDb, Scheduler<TestParser>) {
    let db = FailingDb::new();
    let scheduler = open_scheduler(Arc::new(db.clone()), ledger);
    (db, scheduler)
}

#[test]
fn failed_put_leaves_neither_job_nor_checkpoint() -> TestResult {
    init_tracing();
    let ledger = Ledger::new();
    let (db, mut scheduler) = failing_scheduler(&ledger);
    let entries_before = db.inner().len();

    let job = TestJob::root(b"never lands", &ledger);
    db.fail_writes();
    let err = scheduler.put_job(job.clone()).unwrap_err();
    assert!(matches!(err, QueueError::Io(_)), "got {err:?}");

    assert!(!scheduler.has_job(&job.id())?);
    assert_eq!(scheduler.pending_jobs(), 0);
    assert_eq!(db.inner().len(), entries_before);

    db.heal();
    drop(scheduler);
    let scheduler = open_scheduler(Arc::new(db.clone()), &ledger);
    assert_eq!(scheduler.pending_jobs(), 0);
    assert!(!scheduler.has_job(&job.id())?);

    Ok(())
}

#[test]
fn failed_drain_keeps_every_dependent() -> TestResult {
    let ledger = Ledger::new();
    let (db, mut scheduler) = failing_scheduler(&ledger);

    let d = JobId::from_content(b"dependency");
    let x = JobId::from_content(b"x");
    let y = JobId::from_content(b"y");
    scheduler.add_dependency(d, x)?;
    scheduler.add_dependency(d, y)?;

    db.fail_writes();
    assert!(scheduler.remove_dependencies(d).is_err());

    db.heal();
    assert_eq!(scheduler.remove_dependencies(d)?, vec![x, y]);
    assert!(scheduler.remove_dependencies(d)?.is_empty());

    Ok(())
}

#[test]
fn failed_delete_after_pop_is_fatal_dequeue() -> TestResult {
    let ledger = Ledger::new();
    let (db, mut scheduler) = failing_scheduler(&ledger);

    let job = TestJob::root(b"straddled", &ledger);
    scheduler.put_job(job.clone())?;
    scheduler.add_runnable_job(job.id())?;

    // The head pop commits; the job delete + checkpoint batch does not.
    db.fail_after(1);
    let err = scheduler.remove_runnable_job().unwrap_err();
    assert!(err.is_fatal(), "got {err:?}");
    match err {
        QueueError::Dequeue { job_id, source } => {
            assert_eq!(job_id, job.id());
            assert!(matches!(*source, QueueError::Io(_)), "got {source:?}");
        }
        other => panic!("unexpected error {other:?}"),
    }

    db.heal();
    assert!(!scheduler.has_runnable_job()?);
    assert!(scheduler.has_job(&job.id())?);
    assert_eq!(scheduler.pending_jobs(), 1);

    Ok(())
}
