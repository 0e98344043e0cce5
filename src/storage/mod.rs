//! Object Store Client
//!
//! Capability trait over a blob store with multipart upload and ranged
//! reads, plus the S3-compatible implementation (MinIO, R2, AWS S3).

mod object_store;
mod s3_client;
mod types;

pub use object_store::ObjectStore;
pub use s3_client::S3Client;
pub use types::*;
