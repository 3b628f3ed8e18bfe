// src/db/file.rs

//! Durable store: an in-memory tree rebuilt from an append-only log.
//!
//! Every [`Batch`] becomes one framed record:
//!
//! `[payload len: u32 BE][payload][first 8 bytes of blake3(payload)]`
//!
//! where the payload is a sequence of operations
//! (`1 klen key vlen value` for puts, `2 klen key` for deletes).
//!
//! On open the log is replayed in order. A final record that is cut short or
//! fails its checksum is the product of a crash mid-append: it is dropped and
//! the file truncated back to the last good record. A checksum failure with
//! more log behind it is [`QueueError::Corrupt`] and the file is left as is.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use super::{Batch, BatchOp, Database, DbIterator, Tree};
use crate::errors::{QueueError, Result};

const TAG_PUT: u8 = 1;
const TAG_DELETE: u8 = 2;
const CHECKSUM_LEN: usize = 8;
const HEADER_LEN: usize = 4;

#[derive(Debug)]
struct Inner {
    tree: Tree,
    file: File,
    /// Length of the log up to the end of the last complete record.
    log_len: u64,
    /// Records in the log, used to decide when compaction pays off.
    records: u64,
}

#[derive(Debug)]
pub struct FileDb {
    path: PathBuf,
    sync: bool,
    inner: Mutex<Inner>,
}

impl FileDb {
    /// Open (or create) the log at `path` and replay it.
    ///
    /// With `sync` set, every record is flushed to disk before the write
    /// returns.
    pub fn open(path: impl AsRef<Path>, sync: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let mut log = Vec::new();
        file.read_to_end(&mut log)?;

        let mut tree = Tree::new();
        let replay = replay_log(&log, &mut tree)?;

        if replay.valid_len < log.len() as u64 {
            warn!(
                path = %path.display(),
                discarded = log.len() as u64 - replay.valid_len,
                "discarding torn record at end of log"
            );
            file.set_len(replay.valid_len)?;
            file.sync_all()?;
        }

        info!(
            path = %path.display(),
            records = replay.records,
            keys = tree.len(),
            "opened file store"
        );

        Ok(Self {
            path,
            sync,
            inner: Mutex::new(Inner {
                tree,
                file,
                log_len: replay.valid_len,
                records: replay.records,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records currently in the log.
    pub fn records(&self) -> u64 {
        self.lock().records
    }

    /// Rewrite the log as a single snapshot record of the live keys.
    pub fn compact(&self) -> Result<()> {
        let mut inner = self.lock();

        let mut snapshot = Batch::new();
        for (key, value) in inner.tree.iter() {
            snapshot.put(key.clone(), value.clone());
        }

        let tmp_path = self.path.with_extension("compact");
        {
            let mut tmp = File::create(&tmp_path)?;
            if !snapshot.is_empty() {
                tmp.write_all(&encode_record(&snapshot))?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let before = inner.records;
        inner.log_len = file.metadata()?.len();
        inner.file = file;
        inner.records = u64::from(!snapshot.is_empty());

        info!(
            path = %self.path.display(),
            records_before = before,
            keys = inner.tree.len(),
            "compacted file store"
        );
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn append(&self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let record = encode_record(&batch);

        let mut inner = self.lock();
        if let Err(err) = write_record(&mut inner.file, &record, self.sync) {
            // Cut off whatever part of the record made it out so later
            // appends don't land behind a torn record.
            let log_len = inner.log_len;
            if let Err(trunc_err) = inner.file.set_len(log_len) {
                warn!(error = %trunc_err, "failed to roll back partial log record");
            }
            return Err(err.into());
        }

        inner.log_len += record.len() as u64;
        inner.records += 1;
        batch.apply_to(&mut inner.tree);
        debug!(ops = batch.len(), bytes = record.len(), "appended log record");
        Ok(())
    }
}

impl Database for FileDb {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.lock().tree.get(key).cloned().ok_or(QueueError::NotFound)
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.lock().tree.contains_key(key))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut batch = Batch::new();
        batch.put(key, value);
        self.append(batch)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let mut batch = Batch::new();
        batch.delete(key);
        self.append(batch)
    }

    fn write_batch(&self, batch: Batch) -> Result<()> {
        self.append(batch)
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<DbIterator> {
        Ok(DbIterator::from_tree(&self.lock().tree, prefix))
    }
}

fn write_record(file: &mut File, record: &[u8], sync: bool) -> std::io::Result<()> {
    file.write_all(record)?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = blake3::hash(payload);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash.as_bytes()[..CHECKSUM_LEN]);
    out
}

fn encode_record(batch: &Batch) -> Vec<u8> {
    let mut payload = Vec::new();
    for op in batch.ops() {
        match op {
            BatchOp::Put { key, value } => {
                payload.push(TAG_PUT);
                push_chunk(&mut payload, key);
                push_chunk(&mut payload, value);
            }
            BatchOp::Delete { key } => {
                payload.push(TAG_DELETE);
                push_chunk(&mut payload, key);
            }
        }
    }

    let mut record = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    record.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    record.extend_from_slice(&payload);
    record.extend_from_slice(&checksum(&payload));
    record
}

fn push_chunk(buf: &mut Vec<u8>, chunk: &[u8]) {
    buf.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
    buf.extend_from_slice(chunk);
}

struct Replay {
    valid_len: u64,
    records: u64,
}

fn replay_log(log: &[u8], tree: &mut Tree) -> Result<Replay> {
    let mut offset = 0usize;
    let mut records = 0u64;

    while offset < log.len() {
        let Some(header) = log.get(offset..offset + HEADER_LEN) else {
            break;
        };
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let body_start = offset + HEADER_LEN;
        let body_end = body_start + len;
        let Some(payload) = log.get(body_start..body_end) else {
            break;
        };
        let Some(sum) = log.get(body_end..body_end + CHECKSUM_LEN) else {
            break;
        };
        if sum != checksum(payload) {
            let record_end = body_end + CHECKSUM_LEN;
            if record_end < log.len() {
                return Err(QueueError::Corrupt(format!(
                    "checksum mismatch in record at offset {offset} with {} bytes of log after it",
                    log.len() - record_end
                )));
            }
            // Last record, half written.
            break;
        }

        decode_payload(payload)?.apply_to(tree);
        records += 1;
        offset = body_end + CHECKSUM_LEN;
    }

    Ok(Replay {
        valid_len: offset as u64,
        records,
    })
}

fn decode_payload(payload: &[u8]) -> Result<Batch> {
    let mut batch = Batch::new();
    let mut cursor = payload;
    while let Some((&tag, rest)) = cursor.split_first() {
        cursor = rest;
        match tag {
            TAG_PUT => {
                let key = take_chunk(&mut cursor)?;
                let value = take_chunk(&mut cursor)?;
                batch.put(key, value);
            }
            TAG_DELETE => {
                let key = take_chunk(&mut cursor)?;
                batch.delete(key);
            }
            other => {
                return Err(QueueError::Corrupt(format!(
                    "unknown log operation tag {other}"
                )));
            }
        }
    }
    Ok(batch)
}

fn take_chunk<'a>(cursor: &mut &'a [u8]) -> Result<&'a [u8]> {
    let truncated = || QueueError::Corrupt("log record ends mid-operation".to_string());
    let len_bytes = cursor.get(..4).ok_or_else(truncated)?;
    let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
    let chunk = cursor.get(4..4 + len).ok_or_else(truncated)?;
    *cursor = &cursor[4 + len..];
    Ok(chunk)
}
