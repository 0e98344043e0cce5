//! File Storage Server Library
//!
//! Accepts large files over HTTP, streams them into an S3-compatible object
//! store and records content-addressed metadata in a record store.
//!
//! # Modules
//!
//! - `transfer`: Streaming upload/download engine (the two-store protocol)
//! - `storage`: Object store capability trait and S3 client
//! - `metadata`: Metadata store capability trait, SQLite store, listing
//! - `routes`: HTTP surface

pub mod config;
pub mod error;
pub mod metadata;
pub mod routes;
pub mod state;
pub mod storage;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;
