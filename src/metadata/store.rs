//! Metadata store capability trait

use super::types::{FileRecord, Item, MetadataError};

#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    /// Human-readable backend name used in user-facing error messages
    fn backend_name(&self) -> &'static str;

    /// Insert the record for a freshly committed object
    async fn put_record(&self, object_key: &str, record: &FileRecord) -> Result<(), MetadataError>;

    /// Every stored record, oldest first
    async fn scan(&self) -> Result<Vec<Item>, MetadataError>;

    /// First record carrying the given digest
    async fn get_by_digest(&self, sha256: &str) -> Result<Option<Item>, MetadataError>;
}
