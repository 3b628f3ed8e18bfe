use std::collections::HashSet;

use bootqueue::engine::Executor;
use bootqueue::errors::{QueueError, Result};
use bootqueue::ids::JobId;
use bootqueue::state::Job;

use crate::builders::{Ledger, TestJob};

/// An executor that:
/// - records the order jobs were executed in
/// - marks each executed job in the ledger
/// - checks no job runs before its dependencies
/// - optionally fails on one chosen job.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    ledger: Ledger,
    executed: Vec<JobId>,
    fail_on: Option<JobId>,
}

impl RecordingExecutor {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            executed: Vec::new(),
            fail_on: None,
        }
    }

    pub fn failing_on(mut self, id: JobId) -> Self {
        self.fail_on = Some(id);
        self
    }

    pub fn executed(&self) -> &[JobId] {
        &self.executed
    }

    pub fn executed_set(&self) -> HashSet<JobId> {
        self.executed.iter().copied().collect()
    }
}

impl Executor<TestJob> for RecordingExecutor {
    fn execute(&mut self, job: &TestJob) -> Result<()> {
        let id = job.id();
        if self.fail_on == Some(id) {
            return Err(QueueError::Other(anyhow::anyhow!("executor rejected job {id}")));
        }
        if let Some(dep) = job
            .dependencies()
            .iter()
            .find(|dep| !self.ledger.is_executed(dep))
        {
            return Err(QueueError::Other(anyhow::anyhow!(
                "job {id} executed before its dependency {dep}"
            )));
        }

        self.ledger.mark(id);
        self.executed.push(id);
        Ok(())
    }
}
