// src/db/prefix.rs

//! Namespaces inside a shared root store.

use std::fmt;
use std::sync::Arc;

use super::{Batch, Database, DbIterator};
use crate::errors::Result;

/// A view of `root` restricted to keys under one namespace.
///
/// Namespace names are hashed into fixed 32-byte prefixes, so a nested
/// namespace can never overlap a sibling or a key of its parent that is not
/// itself a namespace.
///
/// Writes that must land together are staged into a [`Batch`] with
/// [`stage_put`](Self::stage_put) / [`stage_delete`](Self::stage_delete) and
/// committed with [`commit`](Self::commit). Batches may mix operations from
/// any namespaces that share the same root.
#[derive(Clone)]
pub struct PrefixDb {
    root: Arc<dyn Database>,
    prefix: Vec<u8>,
}

impl fmt::Debug for PrefixDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixDb")
            .field("depth", &(self.prefix.len() / blake3::OUT_LEN))
            .finish_non_exhaustive()
    }
}

impl PrefixDb {
    pub fn new(root: Arc<dyn Database>, name: &[u8]) -> Self {
        Self {
            root,
            prefix: blake3::hash(name).as_bytes().to_vec(),
        }
    }

    /// Derive a child namespace.
    pub fn nested(&self, name: &[u8]) -> Self {
        let mut prefix = self.prefix.clone();
        prefix.extend_from_slice(blake3::hash(name).as_bytes());
        Self {
            root: Arc::clone(&self.root),
            prefix,
        }
    }

    pub fn root(&self) -> &Arc<dyn Database> {
        &self.root
    }

    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }

    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.root.get(&self.full_key(key))
    }

    pub fn has(&self, key: &[u8]) -> Result<bool> {
        self.root.has(&self.full_key(key))
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.root.put(&self.full_key(key), value)
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.root.delete(&self.full_key(key))
    }

    pub fn stage_put(&self, batch: &mut Batch, key: &[u8], value: &[u8]) {
        batch.put(self.full_key(key), value);
    }

    pub fn stage_delete(&self, batch: &mut Batch, key: &[u8]) {
        batch.delete(self.full_key(key));
    }

    /// Commit a batch staged through any namespace of this root.
    pub fn commit(&self, batch: Batch) -> Result<()> {
        self.root.write_batch(batch)
    }

    /// Iterate the namespace; keys come back relative to it.
    pub fn iter(&self) -> Result<DbIterator> {
        self.iter_prefix(&[])
    }

    /// Iterate keys of the namespace starting with `prefix`; keys come back
    /// relative to the namespace.
    pub fn iter_prefix(&self, prefix: &[u8]) -> Result<DbIterator> {
        let strip = self.prefix.len();
        let entries = self
            .root
            .iter_prefix(&self.full_key(prefix))?
            .map(|(k, v)| (k[strip..].to_vec(), v))
            .collect();
        Ok(DbIterator::new(entries))
    }

    /// Stage deletion of every key in the namespace, nested ones included.
    pub fn stage_clear(&self, batch: &mut Batch) -> Result<usize> {
        let mut removed = 0;
        for (key, _) in self.root.iter_prefix(&self.prefix)? {
            batch.delete(key);
            removed += 1;
        }
        Ok(removed)
    }
}
