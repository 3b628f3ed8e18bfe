// src/db/mod.rs

//! Ordered key-value storage used by the scheduler.
//!
//! - [`Database`] is the storage seam. [`MemDb`] keeps everything in memory,
//!   [`FileDb`] adds an append-only log so state survives a restart.
//! - [`PrefixDb`] isolates a namespace inside a shared root store.
//! - [`OrderedSet`] keeps an insertion-ordered set of keys inside a namespace.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::errors::Result;

pub mod file;
pub mod linked;
pub mod memory;
pub mod prefix;

pub use file::FileDb;
pub use linked::OrderedSet;
pub use memory::MemDb;
pub use prefix::PrefixDb;

/// In-memory ordered tree shared by both backends.
pub(crate) type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// Abstract ordered key-value store.
pub trait Database: Send + Sync + Debug {
    /// Returns [`QueueError::NotFound`](crate::errors::QueueError::NotFound)
    /// when the key is absent.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;
    fn has(&self, key: &[u8]) -> Result<bool>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
    /// Deleting an absent key is a no-op.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Apply every operation of `batch`, or none of them.
    fn write_batch(&self, batch: Batch) -> Result<()>;

    /// Iterate, in key order, over a snapshot of all entries whose key starts
    /// with `prefix`. Keys are returned whole (prefix included).
    fn iter_prefix(&self, prefix: &[u8]) -> Result<DbIterator>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// A group of writes committed atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete { key: key.into() });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }

    /// Apply to an in-memory tree, in order.
    pub(crate) fn apply_to(&self, tree: &mut Tree) {
        for op in &self.ops {
            match op {
                BatchOp::Put { key, value } => {
                    tree.insert(key.clone(), value.clone());
                }
                BatchOp::Delete { key } => {
                    tree.remove(key);
                }
            }
        }
    }
}

/// Forward iterator over a snapshot of store entries.
///
/// The snapshot is owned by the iterator and released when it is dropped, so
/// every exit path (completion, early return, `?`) frees it. Because it is a
/// snapshot, callers may mutate the store while iterating.
#[derive(Debug)]
pub struct DbIterator {
    entries: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl DbIterator {
    pub fn new(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }

    /// Snapshot of the entries of `tree` under `prefix`.
    pub(crate) fn from_tree(tree: &Tree, prefix: &[u8]) -> Self {
        let entries = tree
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::new(entries)
    }
}

impl Iterator for DbIterator {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_applies_in_order() {
        let mut tree = Tree::new();
        let mut batch = Batch::new();
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.put(b"b".to_vec(), b"2".to_vec());
        batch.delete(b"a".to_vec());
        batch.apply_to(&mut tree);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(b"b".as_slice()), Some(&b"2".to_vec()));
    }

    #[test]
    fn iterator_stays_inside_prefix() {
        let mut tree = Tree::new();
        tree.insert(b"aa".to_vec(), vec![]);
        tree.insert(b"ab".to_vec(), vec![]);
        tree.insert(b"b".to_vec(), vec![]);
        tree.insert(b"a".to_vec(), vec![]);

        let keys: Vec<_> = DbIterator::from_tree(&tree, b"a").map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"aa".to_vec(), b"ab".to_vec()]);
    }
}
