//! Error types for the file storage server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::metadata::MetadataError;
use crate::transfer::DownloadError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Transport-level error, mapped onto an HTTP status
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upload request failed outside the per-file handling
    #[error("Something went wrong: {0}.")]
    Upload(String),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Upload(msg) => {
                tracing::error!("Upload request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "upload_error")
            }
            AppError::Download(e) => {
                tracing::error!("Download error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "download_error")
            }
            AppError::Metadata(e) => {
                tracing::error!("Metadata error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "metadata_error")
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let message = match &self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
