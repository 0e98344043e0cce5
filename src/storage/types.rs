//! Storage types

use thiserror::Error;

/// Acknowledgement for one uploaded part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartToken {
    /// 1-based, strictly increasing within a session
    pub part_number: i32,
    /// Opaque checksum token returned by the store (ETag for S3)
    pub e_tag: String,
}

/// State of one in-flight multipart transfer.
///
/// Owned by the upload that opened it and consumed by either
/// [`ObjectStore::complete_transfer`](super::ObjectStore::complete_transfer)
/// or [`ObjectStore::abort_transfer`](super::ObjectStore::abort_transfer).
/// Not `Clone`, so a session cannot be shared between uploads.
#[derive(Debug)]
pub struct TransferSession {
    object_key: String,
    upload_id: String,
    parts: Vec<PartToken>,
}

impl TransferSession {
    pub fn new(object_key: impl Into<String>, upload_id: impl Into<String>) -> Self {
        Self {
            object_key: object_key.into(),
            upload_id: upload_id.into(),
            parts: Vec::new(),
        }
    }

    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn parts(&self) -> &[PartToken] {
        &self.parts
    }

    /// Part number to use for the next chunk
    pub fn next_part_number(&self) -> i32 {
        self.parts.last().map_or(1, |p| p.part_number + 1)
    }

    /// Append the token returned for the most recent part.
    ///
    /// Tokens arriving out of order are rejected so the completion list
    /// always matches file order.
    pub fn record_part(&mut self, token: PartToken) -> Result<(), ObjectStoreError> {
        let expected = self.next_part_number();
        if token.part_number != expected {
            return Err(ObjectStoreError::Request(format!(
                "Part {} recorded out of order for {} (expected {})",
                token.part_number, self.object_key, expected
            )));
        }
        self.parts.push(token);
        Ok(())
    }
}

/// Object store failures, classified for retry decisions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ObjectStoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Service unavailable, throttled, timed out or connection dropped
    #[error("Object store temporarily unavailable: {0}")]
    Transient(String),

    /// Ranged read starting at or past the end of the object
    #[error("Requested range not satisfiable: {0}")]
    RangeNotSatisfiable(String),

    #[error("Object store request failed: {0}")]
    Request(String),
}

impl ObjectStoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
