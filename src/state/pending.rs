// src/state/pending.rs

//! Pending Counter: number of jobs in the Job Store awaiting execution.
//!
//! The count is checkpointed in the same batch as every mutation it accounts
//! for, so a restart reads it back instead of scanning the Job Store.

use tracing::{info, warn};

use crate::db::{Batch, PrefixDb};
use crate::errors::{QueueError, Result};
use crate::state::jobs::JobStore;
use crate::state::job::Parser;

pub(crate) const PENDING_JOBS_KEY: &[u8] = b"pendingJobs";

#[derive(Debug)]
pub struct PendingCounter {
    db: PrefixDb,
    count: u64,
}

impl PendingCounter {
    /// Read the checkpoint. Stores written before checkpoints existed have
    /// none; for those the Job Store is scanned once and the result
    /// persisted, after which this path is never taken again.
    pub fn open<P: Parser>(db: PrefixDb, jobs: &JobStore<P>) -> Result<Self> {
        let count = match db.get(PENDING_JOBS_KEY) {
            Ok(bytes) => decode_count(&bytes)?,
            Err(QueueError::NotFound) => {
                let scanned = jobs.scan_count()?;
                db.put(PENDING_JOBS_KEY, &scanned.to_be_bytes())?;
                info!(pending = scanned, "no pending jobs checkpoint; recovered count from job store");
                scanned
            }
            Err(e) => return Err(e),
        };
        Ok(Self { db, count })
    }

    pub fn get(&self) -> u64 {
        self.count
    }

    /// Stage the incremented checkpoint; returns the value to
    /// [`commit`](Self::commit) once the batch is written.
    pub fn stage_increment(&self, batch: &mut Batch) -> u64 {
        let next = self.count.saturating_add(1);
        self.db.stage_put(batch, PENDING_JOBS_KEY, &next.to_be_bytes());
        next
    }

    /// Stage the decremented checkpoint. At zero the count is clamped and
    /// nothing is staged.
    pub fn stage_decrement(&self, batch: &mut Batch) -> u64 {
        if self.count == 0 {
            warn!("pending jobs counter already at zero; not decrementing");
            return 0;
        }
        let next = self.count - 1;
        self.db.stage_put(batch, PENDING_JOBS_KEY, &next.to_be_bytes());
        next
    }

    pub fn stage_reset(&self, batch: &mut Batch) {
        self.db.stage_put(batch, PENDING_JOBS_KEY, &0u64.to_be_bytes());
    }

    pub fn commit(&mut self, count: u64) {
        self.count = count;
    }
}

fn decode_count(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| QueueError::InvalidCounter { len: bytes.len() })?;
    Ok(u64::from_be_bytes(arr))
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    use super::*;
    use crate::cache::Cache;
    use crate::db::{Database, MemDb};
    use crate::state::job::{RawJob, RawParser};

    fn stores() -> (Arc<dyn Database>, JobStore<RawParser>, PrefixDb) {
        let root: Arc<dyn Database> = Arc::new(MemDb::new());
        let jobs = JobStore::new(
            PrefixDb::new(Arc::clone(&root), b"jobs"),
            RawParser,
            Cache::new(NonZeroUsize::new(4).unwrap()),
        );
        let pending = PrefixDb::new(Arc::clone(&root), PENDING_JOBS_KEY);
        (root, jobs, pending)
    }

    #[test]
    fn missing_checkpoint_is_recovered_by_scan() {
        let (_root, jobs, pending_db) = stores();
        for payload in [b"a", b"b", b"c"] {
            let mut batch = Batch::new();
            jobs.stage_put(&mut batch, &RawJob::new(payload.to_vec()));
            pending_db.commit(batch).unwrap();
        }

        let counter = PendingCounter::open(pending_db.clone(), &jobs).unwrap();
        assert_eq!(counter.get(), 3);
        assert_eq!(
            pending_db.get(PENDING_JOBS_KEY).unwrap(),
            3u64.to_be_bytes().to_vec()
        );
    }

    #[test]
    fn existing_checkpoint_wins_over_scan() {
        let (_root, jobs, pending_db) = stores();
        pending_db.put(PENDING_JOBS_KEY, &7u64.to_be_bytes()).unwrap();
        let counter = PendingCounter::open(pending_db, &jobs).unwrap();
        assert_eq!(counter.get(), 7);
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let (_root, jobs, pending_db) = stores();
        let mut counter = PendingCounter::open(pending_db, &jobs).unwrap();
        let mut batch = Batch::new();
        let next = counter.stage_decrement(&mut batch);
        assert_eq!(next, 0);
        assert!(batch.is_empty());
        counter.commit(next);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn malformed_checkpoint_is_a_conversion_error() {
        let (_root, jobs, pending_db) = stores();
        pending_db.put(PENDING_JOBS_KEY, &[1, 2]).unwrap();
        match PendingCounter::open(pending_db, &jobs) {
            Err(QueueError::InvalidCounter { len }) => assert_eq!(len, 2),
            other => panic!("expected InvalidCounter, got {other:?}"),
        }
    }
}
