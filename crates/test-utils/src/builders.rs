//! Test jobs with explicit dependencies.
//!
//! Wire format of a [`TestJob`]: one byte dependency count, that many 32 byte
//! ids, then an arbitrary payload. The id is the blake3 hash of the whole
//! encoding, so two jobs with the same payload and dependencies are the same
//! job.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use bootqueue::errors::{QueueError, Result};
use bootqueue::ids::{ID_LEN, JobId};
use bootqueue::state::{Job, Parser};

/// Shared record of which jobs have executed.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    executed: Arc<Mutex<HashSet<JobId>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, id: JobId) {
        self.executed.lock().unwrap().insert(id);
    }

    pub fn is_executed(&self, id: &JobId) -> bool {
        self.executed.lock().unwrap().contains(id)
    }

    pub fn len(&self) -> usize {
        self.executed.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct TestJob {
    id: JobId,
    bytes: Vec<u8>,
    dependencies: Vec<JobId>,
    ledger: Ledger,
}

impl TestJob {
    pub fn new(payload: &[u8], dependencies: &[JobId], ledger: &Ledger) -> Self {
        assert!(dependencies.len() <= u8::MAX as usize, "too many dependencies");

        let mut bytes = Vec::with_capacity(1 + dependencies.len() * ID_LEN + payload.len());
        bytes.push(dependencies.len() as u8);
        for dep in dependencies {
            bytes.extend_from_slice(dep.as_bytes());
        }
        bytes.extend_from_slice(payload);

        Self {
            id: JobId::from_content(&bytes),
            bytes,
            dependencies: dependencies.to_vec(),
            ledger: ledger.clone(),
        }
    }

    /// A job without dependencies.
    pub fn root(payload: &[u8], ledger: &Ledger) -> Self {
        Self::new(payload, &[], ledger)
    }

    pub fn dependencies(&self) -> &[JobId] {
        &self.dependencies
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[1 + self.dependencies.len() * ID_LEN..]
    }
}

impl fmt::Debug for TestJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestJob")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("payload", &String::from_utf8_lossy(self.payload()))
            .finish()
    }
}

impl PartialEq for TestJob {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.bytes == other.bytes
    }
}

impl Eq for TestJob {}

impl Job for TestJob {
    fn id(&self) -> JobId {
        self.id
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn missing_dependencies(&self) -> Result<BTreeSet<JobId>> {
        Ok(self
            .dependencies
            .iter()
            .filter(|dep| !self.ledger.is_executed(dep))
            .copied()
            .collect())
    }
}

/// Decodes [`TestJob`]s, binding them to a ledger.
#[derive(Debug, Clone, Default)]
pub struct TestParser {
    ledger: Ledger,
}

impl TestParser {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }
}

impl Parser for TestParser {
    type Job = TestJob;

    fn parse(&self, bytes: &[u8]) -> Result<TestJob> {
        let (&count, rest) = bytes
            .split_first()
            .ok_or_else(|| QueueError::Decode("empty job".to_string()))?;
        let deps_len = count as usize * ID_LEN;
        if rest.len() < deps_len {
            return Err(QueueError::Decode(format!(
                "job declares {count} dependencies but has {} bytes",
                rest.len()
            )));
        }

        let dependencies = rest[..deps_len]
            .chunks_exact(ID_LEN)
            .map(JobId::from_slice)
            .collect::<Result<Vec<_>>>()?;
        let job = TestJob::new(&rest[deps_len..], &dependencies, &self.ledger);
        Ok(job)
    }
}
