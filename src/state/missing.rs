// src/state/missing.rs

//! Missing Set: ids referenced as dependencies but not resident locally.

use tracing::debug;

use crate::db::{Batch, OrderedSet, PrefixDb};
use crate::errors::Result;
use crate::ids::JobId;

#[derive(Debug)]
pub struct MissingSet {
    db: PrefixDb,
    ids: OrderedSet,
}

impl MissingSet {
    pub fn open(db: PrefixDb) -> Result<Self> {
        let ids = OrderedSet::open(db.clone())?;
        Ok(Self { db, ids })
    }

    pub fn add(&mut self, ids: impl IntoIterator<Item = JobId>) -> Result<()> {
        let mut added = 0usize;
        for id in ids {
            if self.ids.put(id.as_ref())? {
                added += 1;
            }
        }
        debug!(added, "added missing job IDs");
        Ok(())
    }

    pub fn remove(&mut self, ids: impl IntoIterator<Item = JobId>) -> Result<()> {
        let mut removed = 0usize;
        for id in ids {
            if self.ids.delete(id.as_ref())? {
                removed += 1;
            }
        }
        debug!(removed, "removed missing job IDs");
        Ok(())
    }

    /// Materialized snapshot, in the order ids were first reported missing.
    pub fn ids(&self) -> Result<Vec<JobId>> {
        self.ids
            .keys()?
            .iter()
            .map(|key| JobId::from_slice(key))
            .collect()
    }

    pub fn len(&self) -> Result<usize> {
        self.ids.len()
    }

    pub fn stage_clear(&self, batch: &mut Batch) -> Result<usize> {
        self.db.stage_clear(batch)
    }

    pub fn reload(&mut self) -> Result<()> {
        self.ids = OrderedSet::open(self.db.clone())?;
        Ok(())
    }
}
