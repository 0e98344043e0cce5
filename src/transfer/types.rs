//! Transfer types

use std::pin::Pin;

use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::metadata::FileRecord;
use crate::storage::ObjectStoreError;

use super::hasher::HashError;

// ============================================================================
// Messages
// ============================================================================

pub const MESSAGE_STORED: &str = "File store successfully.";
pub const MESSAGE_FAILED: &str = "File store failed.";

// ============================================================================
// Upload Request
// ============================================================================

/// One file handed to the upload orchestrator.
///
/// `length` is known before streaming starts; the body is read chunk by
/// chunk and never buffered whole.
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub length: u64,
    pub body: Pin<Box<dyn AsyncRead + Send>>,
}

impl UploadRequest {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        length: u64,
        body: impl AsyncRead + Send + 'static,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            length,
            body: Box::pin(body),
        }
    }
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Transfer Result
// ============================================================================

/// Outcome of storing one file.
///
/// Either `object_key` and `metadata` are both set, or `error` is. The
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    message: String,
    object_key: Option<String>,
    metadata: Option<FileRecord>,
    error: Option<String>,
}

impl TransferResult {
    pub fn stored(object_key: String, metadata: FileRecord) -> Self {
        Self {
            message: MESSAGE_STORED.to_string(),
            object_key: Some(object_key),
            metadata: Some(metadata),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            message: MESSAGE_FAILED.to_string(),
            object_key: None,
            metadata: None,
            error: Some(error.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn object_key(&self) -> Option<&str> {
        self.object_key.as_deref()
    }

    pub fn metadata(&self) -> Option<&FileRecord> {
        self.metadata.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_stored(&self) -> bool {
        self.error.is_none()
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Reasons a single file upload fails
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File size should be between {min} and {max}. File name: {file_name}.")]
    SizeOutOfBounds { min: u64, max: u64, file_name: String },

    #[error("{0}")]
    Transfer(#[from] ObjectStoreError),

    #[error("{0}")]
    Hash(#[from] HashError),

    #[error("Failed to read upload body: {0}")]
    Read(#[from] std::io::Error),

    #[error(
        "Declared length {declared} does not match streamed length {actual}. \
         File name: {file_name}."
    )]
    LengthMismatch {
        declared: u64,
        actual: u64,
        file_name: String,
    },

    /// Metadata write failed after commit; the object was deleted again
    #[error(
        "{metadata_backend} operation failed. File removed from {object_backend}. \
         Error: {message}."
    )]
    Metadata {
        metadata_backend: &'static str,
        object_backend: &'static str,
        message: String,
    },
}

/// Download failures. An absent object is not one of them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    #[error("Max retry attempts exceeded when download file: {key}.")]
    RetryExhausted { key: String },

    #[error("Error downloading file: {key}. Error: {message}.")]
    Failed { key: String, message: String },
}
