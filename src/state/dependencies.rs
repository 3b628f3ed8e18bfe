// src/state/dependencies.rs

//! Dependency Graph: dependency id -> ordered set of dependents.
//!
//! Every dependency owns a nested namespace holding an [`OrderedSet`] of the
//! jobs blocked on it. Deriving a bucket handle means hashing the namespace
//! and reading its tail, so recently used handles are kept in an LRU cache.

use tracing::debug;

use crate::cache::Cache;
use crate::db::{Batch, OrderedSet, PrefixDb};
use crate::errors::Result;
use crate::ids::JobId;

pub struct DependencyGraph {
    db: PrefixDb,
    handles: Cache<JobId, OrderedSet>,
    caching: bool,
}

impl DependencyGraph {
    pub fn new(db: PrefixDb, handles: Cache<JobId, OrderedSet>) -> Self {
        Self {
            db,
            handles,
            caching: true,
        }
    }

    /// Record that `dependent` is blocked on `dependency`. Idempotent.
    pub fn add(&mut self, dependency: JobId, dependent: JobId) -> Result<()> {
        let added = self.with_bucket(dependency, |bucket| bucket.put(dependent.as_ref()))?;
        debug!(?dependency, ?dependent, added, "added dependency");
        Ok(())
    }

    /// Pop every dependent of `dependency`, oldest first.
    ///
    /// The bucket is read and converted completely before anything is
    /// deleted, and the deletions commit as one batch. On error the bucket is
    /// left untouched.
    pub fn remove_all(&mut self, dependency: JobId) -> Result<Vec<JobId>> {
        let dependents = self.with_bucket(dependency, |bucket| bucket.take_all(JobId::from_slice))?;
        debug!(?dependency, count = dependents.len(), "removed dependents");
        Ok(dependents)
    }

    /// Dependents currently waiting on `dependency`, without removing them.
    pub fn dependents(&mut self, dependency: JobId) -> Result<Vec<JobId>> {
        self.with_bucket(dependency, |bucket| {
            bucket
                .keys()?
                .iter()
                .map(|key| JobId::from_slice(key))
                .collect()
        })
    }

    pub fn stage_clear(&self, batch: &mut Batch) -> Result<usize> {
        self.db.stage_clear(batch)
    }

    /// Forget every cached handle. Needed after the namespace is rewritten
    /// behind the handles' back.
    pub fn flush_handles(&mut self) {
        self.handles.flush();
    }

    pub fn disable_caching(&mut self) {
        self.handles.flush();
        self.caching = false;
    }

    pub fn cached_handles(&self) -> usize {
        self.handles.len()
    }

    fn with_bucket<R>(
        &mut self,
        dependency: JobId,
        f: impl FnOnce(&mut OrderedSet) -> Result<R>,
    ) -> Result<R> {
        if self.caching {
            if let Some(bucket) = self.handles.get_mut(&dependency) {
                return f(bucket);
            }
        }

        let mut bucket = OrderedSet::open(self.db.nested(dependency.as_ref()))?;
        let out = f(&mut bucket);
        if self.caching {
            self.handles.put(dependency, bucket);
        }
        out
    }
}
