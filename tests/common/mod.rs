#![allow(dead_code)]

use std::sync::Arc;

use bootqueue::db::{Database, PrefixDb};
use bootqueue::errors::Result;
use bootqueue::ids::JobId;
use bootqueue::state::{Job, PENDING_PREFIX};

pub use bootqueue_test_utils::{
    FailingDb, Ledger, RecordingExecutor, TestJob, TestParser, init_tracing, mem_scheduler,
    open_scheduler, with_timeout,
};

/// `A <- B <- C <- ...`: each job depends on the one before it.
pub fn chain(ledger: &Ledger, len: usize) -> Vec<TestJob> {
    let mut jobs: Vec<TestJob> = Vec::with_capacity(len);
    for i in 0..len {
        let payload = format!("chain-{i}");
        let deps: Vec<JobId> = jobs.last().map(|prev| vec![prev.id()]).unwrap_or_default();
        jobs.push(TestJob::new(payload.as_bytes(), &deps, ledger));
    }
    jobs
}

/// `root <- {left, right} <- tip`.
pub fn diamond(ledger: &Ledger) -> [TestJob; 4] {
    let root = TestJob::root(b"root", ledger);
    let left = TestJob::new(b"left", &[root.id()], ledger);
    let right = TestJob::new(b"right", &[root.id()], ledger);
    let tip = TestJob::new(b"tip", &[left.id(), right.id()], ledger);
    [root, left, right, tip]
}

/// Overwrite the persisted pending-jobs checkpoint.
pub fn write_pending_checkpoint(db: Arc<dyn Database>, value: u64) {
    PrefixDb::new(db, PENDING_PREFIX)
        .put(b"pendingJobs", &value.to_be_bytes())
        .unwrap();
}

/// Remove the persisted pending-jobs checkpoint, as in stores that predate it.
pub fn delete_pending_checkpoint(db: Arc<dyn Database>) {
    PrefixDb::new(db, PENDING_PREFIX)
        .delete(b"pendingJobs")
        .unwrap();
}

/// Read the persisted pending-jobs checkpoint.
pub fn read_pending_checkpoint(db: Arc<dyn Database>) -> Result<Vec<u8>> {
    PrefixDb::new(db, PENDING_PREFIX).get(b"pendingJobs")
}
