// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::ids::JobId;

#[derive(Error, Debug)]
pub enum QueueError {
    /// Key absent from the store (or an empty runnable queue).
    #[error("not found")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store data: {0}")]
    Corrupt(String),

    #[error("failed to decode job: {0}")]
    Decode(String),

    #[error("invalid job ID: expected 32 bytes, got {len}")]
    InvalidId { len: usize },

    #[error("invalid pending jobs checkpoint: expected 8 bytes, got {len}")]
    InvalidCounter { len: usize },

    /// The head of the runnable queue was already removed when the job
    /// lookup or deletion failed. Queue and job store now disagree.
    #[error("dequeue of job {job_id} failed after it left the runnable queue: {source}")]
    Dequeue {
        job_id: JobId,
        #[source]
        source: Box<QueueError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("scheduler actor has shut down")]
    SchedulerClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QueueError {
    /// Errors that leave persisted state inconsistent. Callers must escalate
    /// these instead of retrying the operation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, QueueError::Dequeue { .. } | QueueError::Corrupt(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, QueueError::NotFound)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dequeue_errors_are_fatal() {
        let err = QueueError::Dequeue {
            job_id: JobId::from_content(b"job"),
            source: Box::new(QueueError::NotFound),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn lookup_errors_are_not_fatal() {
        assert!(!QueueError::NotFound.is_fatal());
        assert!(!QueueError::Decode("bad".into()).is_fatal());
        assert!(!QueueError::InvalidId { len: 3 }.is_fatal());
    }
}
