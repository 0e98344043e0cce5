//! S3-compatible storage client
//!
//! Wraps the AWS SDK for S3-compatible storage access.

use std::ops::Range;

use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{
        http::HttpResponse, retry::RetryConfig, timeout::TimeoutConfig, Credentials, Region,
    },
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
    Client,
};

use crate::config::StorageConfig;

use super::object_store::ObjectStore;
use super::types::{ObjectStoreError, PartToken, TransferSession};

/// S3-compatible storage client
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from configuration
    pub async fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "filestorage",
        );

        let region = config
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(region))
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO and other S3-compatible services
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.operation_timeout)
                    .build(),
            )
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts.max(1)))
            .build();

        let client = Client::from_conf(s3_config);

        // Probe the bucket; failure is not fatal
        let bucket = config.bucket.clone();
        match client.head_bucket().bucket(&bucket).send().await {
            Ok(_) => {
                tracing::info!("Connected to S3 bucket: {}", bucket);
            }
            Err(e) => {
                tracing::warn!(
                    "Could not verify bucket {}: {}. Will attempt operations anyway.",
                    bucket,
                    DisplayErrorContext(&e)
                );
            }
        }

        Self { client, bucket }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Client {
    fn backend_name(&self) -> &'static str {
        "S3"
    }

    fn location(&self) -> &str {
        &self.bucket
    }

    async fn begin_transfer(&self, key: &str) -> Result<TransferSession, ObjectStoreError> {
        let response = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, format!("Failed to begin multipart upload for {}", key)))?;

        let upload_id = response.upload_id().ok_or_else(|| {
            ObjectStoreError::Request(format!("No upload id returned for {}", key))
        })?;

        Ok(TransferSession::new(key, upload_id))
    }

    async fn upload_part(
        &self,
        session: &TransferSession,
        part_number: i32,
        data: &[u8],
    ) -> Result<PartToken, ObjectStoreError> {
        let response = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(session.object_key())
            .upload_id(session.upload_id())
            .part_number(part_number)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| {
                classify(
                    e,
                    format!("Failed to upload part {} of {}", part_number, session.object_key()),
                )
            })?;

        let e_tag = response.e_tag().ok_or_else(|| {
            ObjectStoreError::Request(format!(
                "No ETag returned for part {} of {}",
                part_number,
                session.object_key()
            ))
        })?;

        Ok(PartToken {
            part_number,
            e_tag: e_tag.to_string(),
        })
    }

    async fn complete_transfer(
        &self,
        session: TransferSession,
    ) -> Result<String, ObjectStoreError> {
        let parts: Vec<CompletedPart> = session
            .parts()
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.e_tag)
                    .build()
            })
            .collect();

        let response = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(session.object_key())
            .upload_id(session.upload_id())
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                classify(
                    e,
                    format!("Failed to complete multipart upload for {}", session.object_key()),
                )
            })?;

        Ok(response
            .key()
            .map(|k| k.to_string())
            .unwrap_or_else(|| session.object_key().to_string()))
    }

    async fn abort_transfer(&self, session: TransferSession) -> Result<(), ObjectStoreError> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(session.object_key())
            .upload_id(session.upload_id())
            .send()
            .await
            .map_err(|e| {
                classify(
                    e,
                    format!("Failed to abort multipart upload for {}", session.object_key()),
                )
            })?;

        Ok(())
    }

    async fn get_range(&self, key: &str, range: Range<u64>) -> Result<Vec<u8>, ObjectStoreError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .range(format!("bytes={}-{}", range.start, range.end - 1))
            .send()
            .await
            .map_err(|e| classify(e, format!("Failed to get range of {}", key)))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| {
                ObjectStoreError::Transient(format!("Failed to read body of {}: {}", key, e))
            })?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn delete_object(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, format!("Failed to delete object {}", key)))?;

        tracing::info!(object_key = %key, "Deleted object");
        Ok(())
    }
}

const TRANSIENT_STATUS: &[u16] = &[429, 500, 502, 503, 504];
const TRANSIENT_CODES: &[&str] = &[
    "SlowDown",
    "ServiceUnavailable",
    "InternalError",
    "RequestTimeout",
    "Throttling",
];

/// Map an SDK failure onto the store's error classes
fn classify<E>(err: SdkError<E, HttpResponse>, context: String) -> ObjectStoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = format!("{}: {}", context, DisplayErrorContext(&err));

    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            return ObjectStoreError::Transient(message);
        }
        _ => {}
    }

    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.as_service_error().and_then(|e| e.code());

    if status.is_some_and(|s| TRANSIENT_STATUS.contains(&s))
        || code.is_some_and(|c| TRANSIENT_CODES.contains(&c))
    {
        return ObjectStoreError::Transient(message);
    }

    if status == Some(404) || matches!(code, Some("NoSuchKey") | Some("NotFound")) {
        return ObjectStoreError::NotFound(message);
    }

    if status == Some(416) || code == Some("InvalidRange") {
        return ObjectStoreError::RangeNotSatisfiable(message);
    }

    ObjectStoreError::Request(message)
}
