//! Object store capability trait

use std::ops::Range;

use super::types::{ObjectStoreError, PartToken, TransferSession};

/// Minimal operation set the transfer engine needs from a blob store.
///
/// Timeouts and low-level connection retries belong to the implementation;
/// callers only see the classified [`ObjectStoreError`].
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable backend name used in user-facing error messages
    fn backend_name(&self) -> &'static str;

    /// Where objects land (bucket name for S3)
    fn location(&self) -> &str;

    /// Open a multipart transfer for `key`
    async fn begin_transfer(&self, key: &str) -> Result<TransferSession, ObjectStoreError>;

    /// Upload one part. The caller records the returned token on the session.
    async fn upload_part(
        &self,
        session: &TransferSession,
        part_number: i32,
        data: &[u8],
    ) -> Result<PartToken, ObjectStoreError>;

    /// Commit all recorded parts, returning the committed object key
    async fn complete_transfer(&self, session: TransferSession) -> Result<String, ObjectStoreError>;

    /// Discard an uncommitted transfer and its parts
    async fn abort_transfer(&self, session: TransferSession) -> Result<(), ObjectStoreError>;

    /// Read `range` (end exclusive). A short result means the object ended.
    async fn get_range(&self, key: &str, range: Range<u64>) -> Result<Vec<u8>, ObjectStoreError>;

    /// Delete a committed object. Deleting an absent key succeeds.
    async fn delete_object(&self, key: &str) -> Result<(), ObjectStoreError>;
}
