//! Streaming Transfer Engine
//!
//! Moves file bodies between callers and the object store:
//! - Chunked, memory-bounded upload with the SHA-256 digest computed in
//!   lockstep with the parts sent to the store
//! - Compensating delete when the metadata write fails after commit
//! - Chunked ranged download with bounded whole-fetch retry

pub mod buffer;
pub mod download;
pub mod hasher;
pub mod types;
pub mod upload;

pub use buffer::ChunkBuffer;
pub use download::{DownloadOrchestrator, RetryPolicy};
pub use hasher::{HashError, IncrementalHasher, Sha256Digest};
pub use types::*;
pub use upload::UploadOrchestrator;
