use std::io;
use std::sync::{Arc, Mutex};

use bootqueue::db::{Batch, Database, DbIterator, MemDb};
use bootqueue::errors::{QueueError, Result};

/// A `MemDb` whose writes can be made to fail.
///
/// Reads always go through. Clones share the store and the switch, so a test
/// can keep one clone to flip the switch while the scheduler holds another.
#[derive(Debug, Clone, Default)]
pub struct FailingDb {
    inner: MemDb,
    /// `None`: writes succeed. `Some(n)`: `n` more writes succeed, then every
    /// write fails.
    writes_left: Arc<Mutex<Option<usize>>>,
}

impl FailingDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, for inspecting what actually landed.
    pub fn inner(&self) -> &MemDb {
        &self.inner
    }

    /// Fail every write from now on.
    pub fn fail_writes(&self) {
        self.fail_after(0);
    }

    /// Let `n` more writes through, then fail.
    pub fn fail_after(&self, n: usize) {
        *self.writes_left.lock().unwrap() = Some(n);
    }

    pub fn heal(&self) {
        *self.writes_left.lock().unwrap() = None;
    }

    fn check_write(&self) -> Result<()> {
        let mut left = self.writes_left.lock().unwrap();
        match left.as_mut() {
            None => Ok(()),
            Some(0) => Err(QueueError::Io(io::Error::other("injected write failure"))),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
        }
    }
}

impl Database for FailingDb {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.inner.get(key)
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        self.inner.has(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_write()?;
        self.inner.put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.check_write()?;
        self.inner.delete(key)
    }

    fn write_batch(&self, batch: Batch) -> Result<()> {
        self.check_write()?;
        self.inner.write_batch(batch)
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<DbIterator> {
        self.inner.iter_prefix(prefix)
    }
}
