// src/state/job.rs

//! The job abstraction the scheduler stores and hands back.

use std::collections::BTreeSet;

use crate::errors::Result;
use crate::ids::JobId;

/// Opaque, content-identified unit of bootstrap work (a block or vertex).
///
/// The scheduler only relies on [`id`](Job::id) and [`bytes`](Job::bytes).
/// [`missing_dependencies`](Job::missing_dependencies) is the dependency
/// discovery capability used by the [`Jobs`](crate::engine::Jobs) driver to
/// decide whether a job is runnable.
pub trait Job: Clone + Send + 'static {
    fn id(&self) -> JobId;

    /// Serialized form, fed back to the [`Parser`] after a restart.
    fn bytes(&self) -> &[u8];

    /// Dependencies that have not been executed yet.
    fn missing_dependencies(&self) -> Result<BTreeSet<JobId>>;
}

/// Decodes jobs read back from the store.
pub trait Parser: Send + 'static {
    type Job: Job;

    /// Fails with [`QueueError::Decode`](crate::errors::QueueError::Decode)
    /// on corrupt bytes.
    fn parse(&self, bytes: &[u8]) -> Result<Self::Job>;
}

/// A job that is nothing but its bytes. It never has missing dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawJob {
    id: JobId,
    bytes: Vec<u8>,
}

impl RawJob {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            id: JobId::from_content(&bytes),
            bytes,
        }
    }
}

impl Job for RawJob {
    fn id(&self) -> JobId {
        self.id
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn missing_dependencies(&self) -> Result<BTreeSet<JobId>> {
        Ok(BTreeSet::new())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawParser;

impl Parser for RawParser {
    type Job = RawJob;

    fn parse(&self, bytes: &[u8]) -> Result<RawJob> {
        Ok(RawJob::new(bytes))
    }
}
