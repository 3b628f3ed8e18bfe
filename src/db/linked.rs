// src/db/linked.rs

//! Insertion-ordered set of keys stored inside one namespace.
//!
//! Layout relative to the namespace:
//! - `0x00 ++ seq (u64 BE)` -> key      entries, iterated oldest first
//! - `0x01 ++ key`          -> seq      index for membership / delete
//! - `0x02`                 -> next seq tail

use tracing::trace;

use super::{Batch, PrefixDb};
use crate::errors::{QueueError, Result};

const ENTRY: u8 = 0x00;
const INDEX: u8 = 0x01;
const TAIL: [u8; 1] = [0x02];

#[derive(Debug, Clone)]
pub struct OrderedSet {
    db: PrefixDb,
    /// Sequence number the next new key gets. Mirrors the persisted tail.
    tail: u64,
}

impl OrderedSet {
    /// Load the set stored in `db`.
    pub fn open(db: PrefixDb) -> Result<Self> {
        let tail = match db.get(&TAIL) {
            Ok(bytes) => decode_seq(&bytes)?,
            Err(QueueError::NotFound) => 0,
            Err(e) => return Err(e),
        };
        Ok(Self { db, tail })
    }

    /// Append `key` unless it is already a member. Returns whether it was new.
    pub fn put(&mut self, key: &[u8]) -> Result<bool> {
        if self.db.has(&index_key(key))? {
            trace!(key_len = key.len(), "ordered set: key already present");
            return Ok(false);
        }

        let seq = self.tail;
        let next = seq + 1;
        let mut batch = Batch::new();
        self.db.stage_put(&mut batch, &entry_key(seq), key);
        self.db.stage_put(&mut batch, &index_key(key), &seq.to_be_bytes());
        self.db.stage_put(&mut batch, &TAIL, &next.to_be_bytes());
        self.db.commit(batch)?;

        self.tail = next;
        Ok(true)
    }

    /// Remove `key`. Returns whether it was a member.
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        let seq = match self.db.get(&index_key(key)) {
            Ok(bytes) => decode_seq(&bytes)?,
            Err(QueueError::NotFound) => return Ok(false),
            Err(e) => return Err(e),
        };

        let mut batch = Batch::new();
        self.db.stage_delete(&mut batch, &entry_key(seq));
        self.db.stage_delete(&mut batch, &index_key(key));
        self.db.commit(batch)?;
        Ok(true)
    }

    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        self.db.has(&index_key(key))
    }

    /// Oldest member, or [`QueueError::NotFound`] when empty.
    pub fn head_key(&self) -> Result<Vec<u8>> {
        self.db
            .iter_prefix(&[ENTRY])?
            .next()
            .map(|(_, key)| key)
            .ok_or(QueueError::NotFound)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.db.iter_prefix(&[ENTRY])?.next().is_none())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.db.iter_prefix(&[ENTRY])?.count())
    }

    /// Members, oldest first.
    pub fn keys(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.db.iter_prefix(&[ENTRY])?.map(|(_, key)| key).collect())
    }

    /// Convert every member with `convert`, then remove them all in one batch.
    ///
    /// Nothing is deleted unless every conversion succeeded and the batch
    /// committed, so on error the set is exactly as it was.
    pub fn take_all<T>(&mut self, convert: impl Fn(&[u8]) -> Result<T>) -> Result<Vec<T>> {
        let mut batch = Batch::new();
        let mut taken = Vec::new();
        for (entry, key) in self.db.iter_prefix(&[ENTRY])? {
            taken.push(convert(&key)?);
            self.db.stage_delete(&mut batch, &entry);
            self.db.stage_delete(&mut batch, &index_key(&key));
        }
        if batch.is_empty() {
            return Ok(taken);
        }

        self.db.stage_delete(&mut batch, &TAIL);
        self.db.commit(batch)?;
        self.tail = 0;
        Ok(taken)
    }
}

fn entry_key(seq: u64) -> [u8; 9] {
    let mut key = [ENTRY; 9];
    key[1..].copy_from_slice(&seq.to_be_bytes());
    key
}

fn index_key(key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + key.len());
    out.push(INDEX);
    out.extend_from_slice(key);
    out
}

fn decode_seq(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| QueueError::Corrupt(format!("sequence number of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}
