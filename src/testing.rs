//! In-memory store doubles with failure injection

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::config::{
    Config, DownloadConfig, MetadataConfig, ServerConfig, StorageConfig, UploadConfig,
};
use crate::metadata::{AttributeValue, FileRecord, Item, MetadataError, MetadataStore, ATTR_SHA256};
use crate::storage::{ObjectStore, ObjectStoreError, PartToken, TransferSession};

/// Deterministic test payload
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Digest computed independently of the transfer engine
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Configuration with defaults and zero download backoff
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        storage: StorageConfig {
            endpoint: "http://localhost:9000".to_string(),
            bucket: "files".to_string(),
            access_key: "test".to_string(),
            secret_key: "test".to_string(),
            region: None,
            operation_timeout: Duration::from_secs(5),
            max_attempts: 1,
        },
        metadata: MetadataConfig {
            url: "sqlite::memory:".to_string(),
            table: "file_records".to_string(),
            max_connections: 1,
        },
        upload: UploadConfig::default(),
        download: DownloadConfig {
            max_attempts: 3,
            retry_backoff: Duration::ZERO,
        },
    }
}

// ============================================================================
// Object Store
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Begin(String),
    Part(String, i32, usize),
    Complete(String),
    Abort(String),
    GetRange(String, Range<u64>),
    Delete(String),
}

#[derive(Default)]
struct ObjectState {
    objects: HashMap<String, Vec<u8>>,
    uploads: HashMap<String, BTreeMap<i32, Vec<u8>>>,
    calls: Vec<Call>,
    next_upload: u32,
    transient_gets: u32,
    transient_at: Option<(u64, u32)>,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    bucket: String,
    state: Mutex<ObjectState>,
    fail_begin: bool,
    fail_part: Option<i32>,
    fail_complete: bool,
    fail_delete: bool,
    fail_get: bool,
}

impl MemoryObjectStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            ..Default::default()
        }
    }

    pub fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    pub fn failing_part(mut self, part_number: i32) -> Self {
        self.fail_part = Some(part_number);
        self
    }

    pub fn failing_complete(mut self) -> Self {
        self.fail_complete = true;
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn failing_gets(mut self) -> Self {
        self.fail_get = true;
        self
    }

    /// The next `count` ranged reads fail as service-unavailable
    pub fn transient_get_failures(mut self, count: u32) -> Self {
        self.state.get_mut().transient_gets = count;
        self
    }

    /// The next `count` ranged reads starting at `offset` fail as service-unavailable
    pub fn transient_get_failure_at(mut self, offset: u64, count: u32) -> Self {
        self.state.get_mut().transient_at = Some((offset, count));
        self
    }

    pub async fn insert_object(&self, key: &str, data: Vec<u8>) {
        self.state.lock().await.objects.insert(key.to_string(), data);
    }

    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().await.objects.get(key).cloned()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    fn backend_name(&self) -> &'static str {
        "Memory"
    }

    fn location(&self) -> &str {
        &self.bucket
    }

    async fn begin_transfer(&self, key: &str) -> Result<TransferSession, ObjectStoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Begin(key.to_string()));
        if self.fail_begin {
            return Err(ObjectStoreError::Transient("injected begin failure".into()));
        }

        state.next_upload += 1;
        let upload_id = format!("upload-{}", state.next_upload);
        state.uploads.insert(upload_id.clone(), BTreeMap::new());
        Ok(TransferSession::new(key, upload_id))
    }

    async fn upload_part(
        &self,
        session: &TransferSession,
        part_number: i32,
        data: &[u8],
    ) -> Result<PartToken, ObjectStoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Part(
            session.object_key().to_string(),
            part_number,
            data.len(),
        ));
        if self.fail_part == Some(part_number) {
            return Err(ObjectStoreError::Request("injected part failure".into()));
        }

        let parts = state
            .uploads
            .get_mut(session.upload_id())
            .ok_or_else(|| ObjectStoreError::NotFound(session.upload_id().to_string()))?;
        parts.insert(part_number, data.to_vec());

        Ok(PartToken {
            part_number,
            e_tag: format!("{}-{}", session.upload_id(), part_number),
        })
    }

    async fn complete_transfer(
        &self,
        session: TransferSession,
    ) -> Result<String, ObjectStoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Complete(session.object_key().to_string()));
        if self.fail_complete {
            return Err(ObjectStoreError::Request("injected complete failure".into()));
        }

        let mut parts = state
            .uploads
            .remove(session.upload_id())
            .ok_or_else(|| ObjectStoreError::NotFound(session.upload_id().to_string()))?;

        let mut body = Vec::new();
        for token in session.parts() {
            let part = parts.remove(&token.part_number).ok_or_else(|| {
                ObjectStoreError::Request(format!("Unknown part {}", token.part_number))
            })?;
            body.extend_from_slice(&part);
        }

        state.objects.insert(session.object_key().to_string(), body);
        Ok(session.object_key().to_string())
    }

    async fn abort_transfer(&self, session: TransferSession) -> Result<(), ObjectStoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Abort(session.object_key().to_string()));
        state.uploads.remove(session.upload_id());
        Ok(())
    }

    async fn get_range(&self, key: &str, range: Range<u64>) -> Result<Vec<u8>, ObjectStoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::GetRange(key.to_string(), range.clone()));

        if self.fail_get {
            return Err(ObjectStoreError::Request("injected read failure".into()));
        }
        if state.transient_gets > 0 {
            state.transient_gets -= 1;
            return Err(ObjectStoreError::Transient("503 Service Unavailable".into()));
        }
        if let Some((offset, remaining)) = state.transient_at {
            if offset == range.start && remaining > 0 {
                state.transient_at = Some((offset, remaining - 1));
                return Err(ObjectStoreError::Transient("503 Service Unavailable".into()));
            }
        }

        let data = state
            .objects
            .get(key)
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))?;

        let len = data.len() as u64;
        if range.start >= len {
            return Err(ObjectStoreError::RangeNotSatisfiable(key.to_string()));
        }
        let end = range.end.min(len);
        Ok(data[range.start as usize..end as usize].to_vec())
    }

    async fn delete_object(&self, key: &str) -> Result<(), ObjectStoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Delete(key.to_string()));
        if self.fail_delete {
            return Err(ObjectStoreError::Transient("injected delete failure".into()));
        }
        state.objects.remove(key);
        Ok(())
    }
}

// ============================================================================
// Metadata Store
// ============================================================================

#[derive(Default)]
pub struct MemoryMetadataStore {
    items: Mutex<Vec<Item>>,
    fail_put: bool,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_puts(mut self) -> Self {
        self.fail_put = true;
        self
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn items(&self) -> Vec<Item> {
        self.items.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl MetadataStore for MemoryMetadataStore {
    fn backend_name(&self) -> &'static str {
        "Memory"
    }

    async fn put_record(&self, object_key: &str, record: &FileRecord) -> Result<(), MetadataError> {
        if self.fail_put {
            return Err(MetadataError::Database(sqlx::Error::PoolTimedOut));
        }
        let item = record.to_item(object_key)?;
        self.items.lock().await.push(item);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<Item>, MetadataError> {
        Ok(self.items.lock().await.clone())
    }

    async fn get_by_digest(&self, sha256: &str) -> Result<Option<Item>, MetadataError> {
        let wanted = AttributeValue::S(sha256.to_string());
        Ok(self
            .items
            .lock()
            .await
            .iter()
            .find(|item| item.get(ATTR_SHA256) == Some(&wanted))
            .cloned())
    }
}
