//! Metadata record types

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

// ============================================================================
// Attribute Names
// ============================================================================

pub const ATTR_OBJECT_KEY: &str = "objectKey";
pub const ATTR_FILENAME: &str = "filename";
pub const ATTR_CONTENT_TYPE: &str = "contentType";
pub const ATTR_SIZE: &str = "size";
pub const ATTR_SHA256: &str = "sha256";
pub const ATTR_BUCKET_NAME: &str = "bucketName";
pub const ATTR_UPLOADED_AT: &str = "uploadedAt";

// ============================================================================
// File Record
// ============================================================================

/// Metadata for one stored object.
///
/// Only built once the object body is committed, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    /// 64 lowercase hex characters
    pub sha256: String,
    /// Bucket holding the object
    pub bucket_name: String,
    #[serde(serialize_with = "serialize_millis")]
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    /// ISO-8601 UTC timestamp as stored
    pub fn uploaded_at_iso8601(&self) -> String {
        self.uploaded_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Size in the record store's signed integer form
    pub fn stored_size(&self) -> Result<i64, MetadataError> {
        i64::try_from(self.size)
            .map_err(|_| MetadataError::InvalidRecord(format!("Size out of range: {}", self.size)))
    }

    /// Native attribute form used by the record store
    pub fn to_item(&self, object_key: &str) -> Result<Item, MetadataError> {
        let mut item = Item::new();
        item.insert(ATTR_OBJECT_KEY.to_string(), AttributeValue::S(object_key.to_string()));
        item.insert(ATTR_FILENAME.to_string(), AttributeValue::S(self.filename.clone()));
        item.insert(ATTR_CONTENT_TYPE.to_string(), AttributeValue::S(self.content_type.clone()));
        item.insert(ATTR_SIZE.to_string(), AttributeValue::N(self.stored_size()?));
        item.insert(ATTR_SHA256.to_string(), AttributeValue::S(self.sha256.clone()));
        item.insert(ATTR_BUCKET_NAME.to_string(), AttributeValue::S(self.bucket_name.clone()));
        item.insert(ATTR_UPLOADED_AT.to_string(), AttributeValue::S(self.uploaded_at_iso8601()));
        Ok(item)
    }
}

/// Same millisecond form as the stored attribute
fn serialize_millis<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// True for a 64-character lowercase hex SHA-256 digest
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

// ============================================================================
// Native Attribute Representation
// ============================================================================

/// A typed attribute as held by the record store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    S(String),
    N(i64),
}

impl AttributeValue {
    /// String form used when records leave the service
    pub fn to_text(&self) -> String {
        match self {
            Self::S(s) => s.clone(),
            Self::N(n) => n.to_string(),
        }
    }
}

/// One stored record, attribute name -> value
pub type Item = BTreeMap<String, AttributeValue>;

/// One record translated for callers: every value in string form
pub type FieldMap = BTreeMap<String, String>;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
