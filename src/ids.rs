// src/ids.rs

//! Content-derived job identifiers.

use std::fmt;
use std::str::FromStr;

use crate::errors::{QueueError, Result};

/// Width of a [`JobId`] in bytes.
pub const ID_LEN: usize = 32;

/// Fixed-width identifier of a job: the blake3 hash of its serialized bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct JobId([u8; ID_LEN]);

impl JobId {
    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Hash `content` into an identifier.
    pub fn from_content(content: &[u8]) -> Self {
        Self(*blake3::hash(content).as_bytes())
    }

    /// Convert a key read back from the store.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; ID_LEN] = bytes
            .try_into()
            .map_err(|_| QueueError::InvalidId { len: bytes.len() })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for JobId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for JobId {
    type Error = QueueError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_slice(bytes)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", blake3::Hash::from_bytes(self.0).to_hex())
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        let hex = blake3::Hash::from_bytes(self.0).to_hex();
        write!(f, "JobId({})", &hex.as_str()[..12])
    }
}

impl FromStr for JobId {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self> {
        let hash = blake3::Hash::from_hex(s.trim())
            .map_err(|e| QueueError::Decode(format!("invalid job ID {s:?}: {e}")))?;
        Ok(Self(*hash.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(JobId::from_content(b"block"), JobId::from_content(b"block"));
        assert_ne!(JobId::from_content(b"block"), JobId::from_content(b"vertex"));
    }

    #[test]
    fn wrong_width_is_a_conversion_failure() {
        match JobId::from_slice(&[1, 2, 3]) {
            Err(QueueError::InvalidId { len }) => assert_eq!(len, 3),
            other => panic!("expected InvalidId, got {other:?}"),
        }
    }

    #[test]
    fn hex_display_parses_back() {
        let id = JobId::from_content(b"payload");
        let text = id.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<JobId>().unwrap(), id);
        assert!("not-hex".parse::<JobId>().is_err());
    }
}
