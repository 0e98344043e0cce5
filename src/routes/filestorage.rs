//! File storage routes
//!
//! Endpoints:
//! - POST /api/filestorage - Store one or more files (multipart form)
//! - GET /api/filestorage - List all file records
//! - GET /api/filestorage/:id - Download by object key, or look up a record
//!   when `id` is a SHA-256 digest

use std::io::SeekFrom;

use axum::{
    body::Body,
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::error::{AppError, Result};
use crate::metadata::{is_sha256_hex, FieldMap};
use crate::state::AppState;
use crate::transfer::{TransferResult, UploadRequest};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Create the file storage router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_files).post(upload_files))
        .route("/:id", get(get_file))
        // Fields are spooled to disk and size-checked per file
        .layer(DefaultBodyLimit::disable())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/filestorage
///
/// Files are processed one at a time in form order, each yielding its own result.
async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<TransferResult>>> {
    let limit = state.config().upload.max_size;
    let mut results = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(|s| s.to_string()) else {
            tracing::debug!(field = ?field.name(), "Skipping non-file form field");
            continue;
        };
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let (file, length) = spool_field(field, limit).await?;

        tracing::debug!(
            file_name = %file_name,
            content_type = %content_type,
            length = length,
            "Received file"
        );

        let request = UploadRequest::new(file_name, content_type, length, file);
        results.push(state.uploader().store(request).await);
    }

    if results.is_empty() {
        return Err(AppError::BadRequest("No files attached.".to_string()));
    }

    tracing::info!(
        files = results.len(),
        stored = results.iter().filter(|r| r.is_stored()).count(),
        "Upload request processed"
    );

    Ok(Json(results))
}

/// GET /api/filestorage
async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FieldMap>>> {
    let records = state.catalog().list().await?;
    Ok(Json(records))
}

/// GET /api/filestorage/:id
async fn get_file(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    if id.trim().is_empty() {
        return Err(AppError::BadRequest("Key must not be empty.".to_string()));
    }

    if is_sha256_hex(&id) {
        return lookup_by_digest(&state, &id).await;
    }

    download_file(&state, &id).await
}

async fn lookup_by_digest(state: &AppState, sha256: &str) -> Result<Response> {
    match state.catalog().get_by_digest(sha256).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(AppError::NotFound(format!(
            "No file found with sha256: {}.",
            sha256
        ))),
    }
}

async fn download_file(state: &AppState, key: &str) -> Result<Response> {
    let data = state
        .downloader()
        .fetch(key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File not found: {}.", key)))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", key),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Copy a form field into an anonymous temp file so its length is known.
///
/// Bytes beyond `limit` are counted but not written; the reported length
/// still reflects the full field so size validation rejects it.
async fn spool_field(mut field: Field<'_>, limit: u64) -> Result<(File, u64)> {
    let std_file = tokio::task::spawn_blocking(tempfile::tempfile)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Upload(e.to_string()))?;
    let mut file = File::from_std(std_file);

    let mut length = 0u64;
    while let Some(bytes) = field
        .chunk()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        let room = limit.saturating_sub(length).min(bytes.len() as u64) as usize;
        if room > 0 {
            file.write_all(&bytes[..room])
                .await
                .map_err(|e| AppError::Upload(e.to_string()))?;
        }
        length += bytes.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?;
    file.seek(SeekFrom::Start(0))
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?;

    Ok((file, length))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::UploadConfig;
    use crate::routes::app;
    use crate::testing::{payload, sha256_hex, test_config, MemoryMetadataStore, MemoryObjectStore};

    use super::*;

    const BOUNDARY: &str = "----filestorage-test-boundary-7d1f";

    fn multipart_body(files: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, content_type, data) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\n\
                     Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                     Content-Type: {}\r\n\r\n",
                    BOUNDARY, name, content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/filestorage")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn test_app(upload: UploadConfig) -> (Router, Arc<MemoryObjectStore>) {
        let objects = Arc::new(MemoryObjectStore::new("files"));
        let records = Arc::new(MemoryMetadataStore::new());
        let mut config = test_config();
        config.upload = upload;
        let state = AppState::new(config, objects.clone(), records);
        (app(state), objects)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_upload_download_and_lookup() {
        let (app, _) = test_app(UploadConfig::default());
        let data = payload(150 * 1024);
        let digest = sha256_hex(&data);

        let response = app
            .clone()
            .oneshot(upload_request(multipart_body(&[("test.txt", "text/plain", &data)])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let results = body_json(response).await;
        let result = &results[0];
        assert_eq!(result["message"], "File store successfully.");
        assert_eq!(result["metadata"]["sha256"], digest.as_str());
        assert_eq!(result["metadata"]["contentType"], "text/plain");
        assert!(result["error"].is_null());
        let key = result["objectKey"].as_str().unwrap().to_string();
        assert!(key.contains("test.txt"));

        // Download by key
        let response = app
            .clone()
            .oneshot(get(&format!("/api/filestorage/{}", key)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), data.as_slice());

        // Lookup by digest
        let response = app
            .clone()
            .oneshot(get(&format!("/api/filestorage/{}", digest)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record = body_json(response).await;
        assert_eq!(record["objectKey"], key.as_str());
        assert_eq!(record["size"], "153600");

        // List
        let response = app.oneshot(get("/api/filestorage")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["filename"], "test.txt");
        assert_eq!(listed[0]["bucketName"], "files");
    }

    #[tokio::test]
    async fn test_upload_without_files_is_bad_request() {
        let (app, _) = test_app(UploadConfig::default());
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
            b = BOUNDARY
        );

        let response = app
            .oneshot(upload_request(body.into_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_each_file_gets_its_own_result() {
        let (app, objects) = test_app(UploadConfig {
            min_size: 1024,
            max_size: 200 * 1024,
        });
        let first = payload(150 * 1024);
        let too_big = payload(300 * 1024);
        let third = payload(180 * 1024);

        let response = app
            .clone()
            .oneshot(upload_request(multipart_body(&[
                ("one.bin", "application/octet-stream", &first),
                ("big.bin", "application/octet-stream", &too_big),
                ("three.bin", "application/octet-stream", &third),
            ])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let results = body_json(response).await;
        assert_eq!(results.as_array().unwrap().len(), 3);
        assert_eq!(results[0]["message"], "File store successfully.");
        assert_eq!(results[1]["message"], "File store failed.");
        assert_eq!(
            results[1]["error"],
            "File size should be between 1024 and 204800. File name: big.bin."
        );
        assert!(results[1]["objectKey"].is_null());
        assert!(results[1]["metadata"].is_null());
        assert_eq!(results[2]["message"], "File store successfully.");
        assert_eq!(results[2]["metadata"]["sha256"], sha256_hex(&third).as_str());

        // Files are handled in form order and only accepted ones reach the store
        let begins: Vec<String> = objects
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                crate::testing::Call::Begin(key) => Some(key),
                _ => None,
            })
            .collect();
        assert_eq!(begins.len(), 2);
        assert!(begins[0].ends_with("-one.bin"));
        assert!(begins[1].ends_with("-three.bin"));

        let response = app.oneshot(get("/api/filestorage")).await.unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let (app, _) = test_app(UploadConfig::default());

        let response = app
            .oneshot(get("/api/filestorage/3fa85f64-5717-4562-b3fc-2c963f66afa6-none.txt"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_digest_is_not_found() {
        let (app, _) = test_app(UploadConfig::default());

        let response = app
            .oneshot(get(&format!("/api/filestorage/{}", "a".repeat(64))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app(UploadConfig::default());

        let response = app.oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }
}
