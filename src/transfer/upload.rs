//! Upload Orchestrator
//!
//! Drives one file through validation, multipart transfer, digest
//! computation and metadata persistence. Every outcome is reported as a
//! [`TransferResult`]; nothing escapes as an error.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::metadata::{FileRecord, MetadataStore};
use crate::storage::{ObjectStore, TransferSession};

use super::buffer::{ChunkBuffer, DEFAULT_CHUNK_SIZE};
use super::hasher::{IncrementalHasher, Sha256Digest};
use super::types::{TransferResult, UploadError, UploadRequest};

pub struct UploadOrchestrator {
    object_store: Arc<dyn ObjectStore>,
    metadata_store: Arc<dyn MetadataStore>,
    limits: UploadConfig,
    chunk_size: usize,
}

impl UploadOrchestrator {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        metadata_store: Arc<dyn MetadataStore>,
        limits: UploadConfig,
    ) -> Self {
        Self {
            object_store,
            metadata_store,
            limits,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the part size. Real S3 rejects parts under 5MB except the last.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Store one file
    pub async fn store(&self, request: UploadRequest) -> TransferResult {
        let file_name = request.file_name.clone();

        match self.try_store(request).await {
            Ok((object_key, record)) => {
                tracing::info!(
                    object_key = %object_key,
                    file_name = %file_name,
                    size = record.size,
                    sha256 = %record.sha256,
                    "File stored successfully"
                );
                TransferResult::stored(object_key, record)
            }
            Err(e) => {
                tracing::warn!(file_name = %file_name, error = %e, "File store failed");
                TransferResult::failed(e.to_string())
            }
        }
    }

    async fn try_store(
        &self,
        mut request: UploadRequest,
    ) -> Result<(String, FileRecord), UploadError> {
        self.validate(&request)?;

        let key = generate_object_key(&request.file_name);
        let mut session = self.object_store.begin_transfer(&key).await?;

        tracing::info!(
            object_key = %key,
            upload_id = %session.upload_id(),
            length = request.length,
            "Began multipart transfer"
        );

        let digest = match self.stream_parts(&mut session, &mut request).await {
            Ok(digest) => digest,
            Err(e) => {
                self.abort(session).await;
                return Err(e);
            }
        };

        let object_key = self.object_store.complete_transfer(session).await?;

        let record = FileRecord {
            filename: request.file_name,
            content_type: request.content_type,
            size: request.length,
            sha256: digest.to_hex(),
            bucket_name: self.object_store.location().to_string(),
            uploaded_at: Utc::now(),
        };

        if let Err(e) = self.metadata_store.put_record(&object_key, &record).await {
            tracing::error!(
                object_key = %object_key,
                error = %e,
                "Metadata write failed after commit, removing object"
            );
            self.compensate(&object_key).await;
            return Err(UploadError::Metadata {
                metadata_backend: self.metadata_store.backend_name(),
                object_backend: self.object_store.backend_name(),
                message: e.to_string(),
            });
        }

        Ok((object_key, record))
    }

    fn validate(&self, request: &UploadRequest) -> Result<(), UploadError> {
        if !self.limits.accepts(request.length) {
            return Err(UploadError::SizeOutOfBounds {
                min: self.limits.min_size,
                max: self.limits.max_size,
                file_name: request.file_name.clone(),
            });
        }
        Ok(())
    }

    /// Send the body part by part, hashing exactly the bytes sent.
    ///
    /// Each chunk is uploaded and hashed before the buffer is refilled.
    async fn stream_parts(
        &self,
        session: &mut TransferSession,
        request: &mut UploadRequest,
    ) -> Result<Sha256Digest, UploadError> {
        let mut buffer = ChunkBuffer::new(self.chunk_size);
        let mut hasher = IncrementalHasher::new();

        loop {
            let chunk = buffer.fill(&mut request.body).await?;
            if chunk.is_empty() {
                break;
            }

            let streamed = hasher.bytes_hashed() + chunk.len() as u64;
            if streamed > request.length {
                return Err(UploadError::LengthMismatch {
                    declared: request.length,
                    actual: streamed,
                    file_name: request.file_name.clone(),
                });
            }

            let part_number = session.next_part_number();
            let token = self
                .object_store
                .upload_part(session, part_number, chunk)
                .await?;
            session.record_part(token)?;
            hasher.update(chunk);

            tracing::debug!(
                object_key = %session.object_key(),
                part_number = part_number,
                part_size = chunk.len(),
                bytes_sent = streamed,
                "Uploaded part"
            );
        }

        if hasher.bytes_hashed() != request.length {
            return Err(UploadError::LengthMismatch {
                declared: request.length,
                actual: hasher.bytes_hashed(),
                file_name: request.file_name.clone(),
            });
        }

        Ok(hasher.finalize()?)
    }

    /// Release an uncommitted transfer. Failures are only logged.
    async fn abort(&self, session: TransferSession) {
        let key = session.object_key().to_string();
        match self.object_store.abort_transfer(session).await {
            Ok(()) => tracing::info!(object_key = %key, "Aborted multipart transfer"),
            Err(e) => {
                tracing::warn!(object_key = %key, error = %e, "Failed to abort multipart transfer")
            }
        }
    }

    /// Best-effort delete of a committed object whose metadata could not be written.
    ///
    /// A failure leaves an orphaned object; it is logged with the key for
    /// reconciliation and not reported to the caller.
    async fn compensate(&self, object_key: &str) {
        match self.object_store.delete_object(object_key).await {
            Ok(()) => tracing::info!(object_key = %object_key, "Compensating delete succeeded"),
            Err(e) => tracing::error!(
                orphaned_key = %object_key,
                error = %e,
                "Compensating delete failed, object has no metadata record"
            ),
        }
    }
}

/// Random UUID joined with the URL-encoded file name
pub fn generate_object_key(file_name: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), urlencoding::encode(file_name))
}

// ============================================================================
// Tests
// ============================================================================
