//! Metadata Store Client
//!
//! One [`FileRecord`] per committed object, kept in a record store that
//! supports single-record insert, full scan and lookup by digest.

mod catalog;
mod sqlite;
mod store;
mod types;

pub use catalog::{to_field_map, Catalog};
pub use sqlite::SqliteMetadataStore;
pub use store::MetadataStore;
pub use types::*;
