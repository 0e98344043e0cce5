//! Download Orchestrator
//!
//! Pulls an object in successive fixed-size ranges and reassembles it. A
//! transient failure restarts the whole fetch after a fixed backoff, up to
//! a bounded number of attempts.

use std::sync::Arc;
use std::time::Duration;

use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;

use crate::config::DownloadConfig;
use crate::storage::{ObjectStore, ObjectStoreError};

use super::buffer::DEFAULT_CHUNK_SIZE;
use super::types::DownloadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl From<DownloadConfig> for RetryPolicy {
    fn from(config: DownloadConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: config.retry_backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        DownloadConfig::default().into()
    }
}

pub struct DownloadOrchestrator {
    object_store: Arc<dyn ObjectStore>,
    policy: RetryPolicy,
    chunk_size: u64,
}

impl DownloadOrchestrator {
    pub fn new(object_store: Arc<dyn ObjectStore>, policy: RetryPolicy) -> Self {
        Self {
            object_store,
            policy,
            chunk_size: DEFAULT_CHUNK_SIZE as u64,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Fetch the whole object. `Ok(None)` means the key does not exist.
    pub async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, DownloadError> {
        let retries = self.policy.max_attempts.saturating_sub(1) as usize;
        let strategy = FixedInterval::new(self.policy.backoff).take(retries);

        let result = RetryIf::spawn(
            strategy,
            || self.fetch_once(key),
            |e: &ObjectStoreError| {
                if e.is_transient() {
                    tracing::warn!(
                        object_key = %key,
                        max_attempts = self.policy.max_attempts,
                        error = %e,
                        "Transient download failure"
                    );
                }
                e.is_transient()
            },
        )
        .await;

        match result {
            Ok(data) => {
                tracing::debug!(object_key = %key, size = data.len(), "Downloaded object");
                Ok(Some(data))
            }
            Err(ObjectStoreError::NotFound(_)) => {
                tracing::debug!(object_key = %key, "Object not found");
                Ok(None)
            }
            Err(e) if e.is_transient() => {
                tracing::error!(
                    object_key = %key,
                    attempts = self.policy.max_attempts,
                    error = %e,
                    "Download retries exhausted"
                );
                Err(DownloadError::RetryExhausted {
                    key: key.to_string(),
                })
            }
            Err(e) => {
                tracing::error!(object_key = %key, error = %e, "Download failed");
                Err(DownloadError::Failed {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// One pass over the object, starting at offset 0
    async fn fetch_once(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let mut output = Vec::new();
        let mut offset = 0u64;

        loop {
            let range = offset..offset + self.chunk_size;
            let chunk = match self.object_store.get_range(key, range).await {
                Ok(chunk) => chunk,
                // Object length is an exact multiple of the chunk size
                Err(ObjectStoreError::RangeNotSatisfiable(_)) => Vec::new(),
                Err(e) => return Err(e),
            };

            let len = chunk.len() as u64;
            output.extend_from_slice(&chunk);

            if len < self.chunk_size {
                break;
            }
            offset += len;
        }

        Ok(output)
    }
}
