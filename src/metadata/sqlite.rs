//! SQLite-backed metadata store

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::{is_valid_identifier, MetadataConfig};

use super::store::MetadataStore;
use super::types::{FileRecord, Item, MetadataError};

/// Row shape of the records table
#[derive(Debug, Clone, sqlx::FromRow)]
struct FileRow {
    object_key: String,
    filename: String,
    content_type: String,
    size: i64,
    sha256: String,
    bucket_name: String,
    uploaded_at: String,
}

impl TryFrom<FileRow> for Item {
    type Error = MetadataError;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        let uploaded_at = DateTime::parse_from_rfc3339(&row.uploaded_at)
            .map_err(|e| {
                MetadataError::InvalidRecord(format!(
                    "Bad uploaded_at for {}: {}",
                    row.object_key, e
                ))
            })?
            .with_timezone(&Utc);
        let size = u64::try_from(row.size).map_err(|_| {
            MetadataError::InvalidRecord(format!("Negative size for {}", row.object_key))
        })?;

        let record = FileRecord {
            filename: row.filename,
            content_type: row.content_type,
            size,
            sha256: row.sha256,
            bucket_name: row.bucket_name,
            uploaded_at,
        };
        record.to_item(&row.object_key)
    }
}

/// Metadata store over a SQLite table
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteMetadataStore {
    /// Connect and create the records table if needed
    pub async fn connect(config: &MetadataConfig) -> Result<Self, MetadataError> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        Self::with_pool(pool, &config.table).await
    }

    /// Use an existing pool
    pub async fn with_pool(pool: SqlitePool, table: &str) -> Result<Self, MetadataError> {
        if !is_valid_identifier(table) {
            return Err(MetadataError::InvalidRecord(format!(
                "Invalid table name: {}",
                table
            )));
        }

        let store = Self {
            pool,
            table: table.to_string(),
        };
        store.initialize_schema().await?;

        tracing::info!(table = %store.table, "Metadata store ready");
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<(), MetadataError> {
        let schema = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                object_key TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                content_type TEXT NOT NULL,
                size INTEGER NOT NULL,
                sha256 TEXT NOT NULL,
                bucket_name TEXT NOT NULL,
                uploaded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_sha256 ON {table}(sha256);
            "#,
            table = self.table
        );

        sqlx::query(&schema).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MetadataStore for SqliteMetadataStore {
    fn backend_name(&self) -> &'static str {
        "SQLite"
    }

    async fn put_record(&self, object_key: &str, record: &FileRecord) -> Result<(), MetadataError> {
        let size = record.stored_size()?;

        let sql = format!(
            r#"
            INSERT INTO {}
                (object_key, filename, content_type, size, sha256, bucket_name, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            self.table
        );

        sqlx::query(&sql)
            .bind(object_key)
            .bind(&record.filename)
            .bind(&record.content_type)
            .bind(size)
            .bind(&record.sha256)
            .bind(&record.bucket_name)
            .bind(record.uploaded_at_iso8601())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn scan(&self) -> Result<Vec<Item>, MetadataError> {
        let sql = format!(
            r#"
            SELECT object_key, filename, content_type, size, sha256, bucket_name, uploaded_at
            FROM {}
            ORDER BY rowid ASC
            "#,
            self.table
        );

        let rows = sqlx::query_as::<_, FileRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Item::try_from).collect()
    }

    async fn get_by_digest(&self, sha256: &str) -> Result<Option<Item>, MetadataError> {
        let sql = format!(
            r#"
            SELECT object_key, filename, content_type, size, sha256, bucket_name, uploaded_at
            FROM {}
            WHERE sha256 = ?
            ORDER BY rowid ASC
            LIMIT 1
            "#,
            self.table
        );

        let row = sqlx::query_as::<_, FileRow>(&sql)
            .bind(sha256)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Item::try_from).transpose()
    }
}
