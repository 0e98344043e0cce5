//! Listing and digest lookup over the metadata store
//!
//! Pure pass-through: no existence check against the object store is made,
//! so entries can outlive objects deleted out of band.

use std::sync::Arc;

use super::store::MetadataStore;
use super::types::{FieldMap, Item, MetadataError};

/// Read-side view of the stored file records
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn MetadataStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Every record as a field mapping, in store order
    pub async fn list(&self) -> Result<Vec<FieldMap>, MetadataError> {
        let items = self.store.scan().await?;
        tracing::debug!(count = items.len(), "Listed file records");
        Ok(items.iter().map(to_field_map).collect())
    }

    /// The record with the given digest, if any
    pub async fn get_by_digest(&self, sha256: &str) -> Result<Option<FieldMap>, MetadataError> {
        let item = self.store.get_by_digest(sha256).await?;
        Ok(item.as_ref().map(to_field_map))
    }
}

/// Translate a native record into its string form
pub fn to_field_map(item: &Item) -> FieldMap {
    item.iter()
        .map(|(name, value)| (name.clone(), value.to_text()))
        .collect()
}
