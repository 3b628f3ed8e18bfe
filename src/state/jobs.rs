// src/state/jobs.rs

//! Job Store: job id -> serialized job, fronted by a content cache.

use tracing::{debug, trace};

use crate::cache::Cache;
use crate::db::{Batch, PrefixDb};
use crate::errors::Result;
use crate::ids::JobId;
use crate::state::job::{Job, Parser};

pub struct JobStore<P: Parser> {
    db: PrefixDb,
    parser: P,
    cache: Cache<JobId, P::Job>,
    caching: bool,
}

impl<P: Parser> JobStore<P> {
    pub fn new(db: PrefixDb, parser: P, cache: Cache<JobId, P::Job>) -> Self {
        Self {
            db,
            parser,
            cache,
            caching: true,
        }
    }

    /// Stage `id -> bytes`. The caller commits the batch and then calls
    /// [`cache_put`](Self::cache_put).
    pub fn stage_put(&self, batch: &mut Batch, job: &P::Job) {
        self.db.stage_put(batch, job.id().as_ref(), job.bytes());
    }

    /// Remember a job whose write has been committed.
    pub fn cache_put(&mut self, job: P::Job) {
        if self.caching {
            self.cache.put(job.id(), job);
        }
    }

    pub fn has(&self, id: &JobId) -> Result<bool> {
        if self.caching && self.cache.contains(id) {
            return Ok(true);
        }
        self.db.has(id.as_ref())
    }

    /// Cache first, then the store. Only a successful decode is cached.
    pub fn get(&mut self, id: &JobId) -> Result<P::Job> {
        if self.caching {
            if let Some(job) = self.cache.get(id) {
                trace!(job = ?id, "job served from cache");
                return Ok(job.clone());
            }
        }

        let bytes = self.db.get(id.as_ref())?;
        let job = self.parser.parse(&bytes)?;
        if self.caching {
            self.cache.put(*id, job.clone());
        }
        Ok(job)
    }

    pub fn stage_delete(&self, batch: &mut Batch, id: &JobId) {
        self.db.stage_delete(batch, id.as_ref());
    }

    /// Drop a deleted job from the cache.
    pub fn evict(&mut self, id: &JobId) {
        self.cache.remove(id);
    }

    /// Count persisted jobs by scanning the whole namespace.
    pub fn scan_count(&self) -> Result<u64> {
        let count = self.db.iter()?.count() as u64;
        debug!(count, "scanned job store");
        Ok(count)
    }

    pub fn stage_clear(&self, batch: &mut Batch) -> Result<usize> {
        self.db.stage_clear(batch)
    }

    pub fn flush_cache(&mut self) {
        self.cache.flush();
    }

    pub fn disable_caching(&mut self) {
        self.cache.flush();
        self.caching = false;
    }

    pub fn caching(&self) -> bool {
        self.caching
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
