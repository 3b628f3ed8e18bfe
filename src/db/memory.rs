// src/db/memory.rs

use std::sync::{Arc, Mutex, MutexGuard};

use super::{Batch, Database, DbIterator, Tree};
use crate::errors::{QueueError, Result};

/// Volatile store backed by a `BTreeMap`.
///
/// Clones share the same tree, which lets tests reopen a scheduler over the
/// state left behind by a previous one.
#[derive(Debug, Clone, Default)]
pub struct MemDb {
    tree: Arc<Mutex<Tree>>,
}

impl MemDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys across all namespaces.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        // A poisoned tree is still structurally valid; every mutation is a
        // single insert/remove or a whole batch applied under the lock.
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Database for MemDb {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.lock().get(key).cloned().ok_or(QueueError::NotFound)
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.lock().contains_key(key))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.lock().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn write_batch(&self, batch: Batch) -> Result<()> {
        batch.apply_to(&mut self.lock());
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<DbIterator> {
        Ok(DbIterator::from_tree(&self.lock(), prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_key_is_not_found() {
        let db = MemDb::new();
        assert!(db.get(b"nope").unwrap_err().is_not_found());
        assert!(!db.has(b"nope").unwrap());
    }

    #[test]
    fn clones_share_state() {
        let db = MemDb::new();
        let other = db.clone();
        db.put(b"k", b"v").unwrap();
        assert_eq!(other.get(b"k").unwrap(), b"v".to_vec());
        other.delete(b"k").unwrap();
        assert!(db.is_empty());
    }

    #[test]
    fn deleting_while_iterating_is_safe() {
        let db = MemDb::new();
        for i in 0u8..5 {
            db.put(&[b'p', i], &[]).unwrap();
        }
        let mut seen = 0;
        for (key, _) in db.iter_prefix(b"p").unwrap() {
            db.delete(&key).unwrap();
            seen += 1;
        }
        assert_eq!(seen, 5);
        assert!(db.is_empty());
    }
}
