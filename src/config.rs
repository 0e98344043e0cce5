//! Configuration management for the file storage server
//!
//! Read once at startup from the environment (after `.env` is loaded) and
//! handed to the store clients and orchestrators by construction.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default lower bound on accepted file size: 128 KiB
pub const DEFAULT_MIN_FILE_SIZE: u64 = 128 * 1024;

/// Default upper bound on accepted file size: 2 GiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Errors raised while loading configuration. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub metadata: MetadataConfig,
    pub upload: UploadConfig,
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
    /// Per-call timeout applied by the S3 client
    pub operation_timeout: Duration,
    /// Attempts made by the SDK's internal retry for a single call
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    pub url: String,
    pub table: String,
    pub max_connections: u32,
}

/// Accepted file size range, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UploadConfig {
    pub min_size: u64,
    pub max_size: u64,
}

impl UploadConfig {
    pub fn accepts(&self, length: u64) -> bool {
        self.min_size <= length && length <= self.max_size
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_FILE_SIZE,
            max_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DownloadConfig {
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff: Duration::from_millis(1000),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let upload = UploadConfig {
            min_size: parse_or("FILE_MIN_SIZE", DEFAULT_MIN_FILE_SIZE)?,
            max_size: parse_or("FILE_MAX_SIZE", DEFAULT_MAX_FILE_SIZE)?,
        };
        if upload.min_size > upload.max_size {
            return Err(ConfigError::Invalid {
                key: "FILE_MIN_SIZE",
                value: format!(
                    "{} exceeds FILE_MAX_SIZE {}",
                    upload.min_size, upload.max_size
                ),
            });
        }

        let download = DownloadConfig {
            max_attempts: parse_or("DOWNLOAD_MAX_ATTEMPTS", 3u32)?,
            retry_backoff: Duration::from_millis(parse_or(
                "DOWNLOAD_RETRY_BACKOFF_MS",
                1000u64,
            )?),
        };
        if download.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "DOWNLOAD_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        let table = env::var("METADATA_TABLE").unwrap_or_else(|_| "file_records".to_string());
        if !is_valid_identifier(&table) {
            return Err(ConfigError::Invalid {
                key: "METADATA_TABLE",
                value: table,
            });
        }

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_or("SERVER_PORT", 8080u16)?,
            },
            storage: StorageConfig {
                endpoint: required("S3_ENDPOINT")?,
                bucket: required("S3_BUCKET")?,
                access_key: required("S3_ACCESS_KEY")?,
                secret_key: required("S3_SECRET_KEY")?,
                region: env::var("S3_REGION").ok(),
                operation_timeout: Duration::from_secs(parse_or(
                    "S3_OPERATION_TIMEOUT_SECS",
                    30u64,
                )?),
                max_attempts: parse_or("S3_MAX_ATTEMPTS", 3u32)?,
            },
            metadata: MetadataConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:./filestorage.db".to_string()),
                table,
                max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5u32)?,
            },
            upload,
            download,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
