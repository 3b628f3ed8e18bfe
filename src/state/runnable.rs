// src/state/runnable.rs

//! Runnable Queue: ids of jobs whose dependencies are all satisfied.

use crate::db::{Batch, OrderedSet, PrefixDb};
use crate::errors::Result;
use crate::ids::JobId;

#[derive(Debug)]
pub struct RunnableQueue {
    db: PrefixDb,
    ids: OrderedSet,
}

impl RunnableQueue {
    pub fn open(db: PrefixDb) -> Result<Self> {
        let ids = OrderedSet::open(db.clone())?;
        Ok(Self { db, ids })
    }

    /// Append to the tail. An id still queued is left where it is.
    pub fn push(&mut self, id: JobId) -> Result<bool> {
        self.ids.put(id.as_ref())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.ids.is_empty()
    }

    /// Remove the head entry and return its raw key. The caller converts it.
    pub fn pop_head(&mut self) -> Result<Vec<u8>> {
        let head = self.ids.head_key()?;
        self.ids.delete(&head)?;
        Ok(head)
    }

    pub fn ids(&self) -> Result<Vec<JobId>> {
        self.ids
            .keys()?
            .iter()
            .map(|key| JobId::from_slice(key))
            .collect()
    }

    pub fn stage_clear(&self, batch: &mut Batch) -> Result<usize> {
        self.db.stage_clear(batch)
    }

    /// Reload after the namespace was rewritten underneath.
    pub fn reload(&mut self) -> Result<()> {
        self.ids = OrderedSet::open(self.db.clone())?;
        Ok(())
    }
}
