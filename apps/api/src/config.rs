//! Application configuration loading from environment variables.
//!
//! Configuration is read once at startup; a `.env` file is honoured when
//! present. Blank optional values are treated as absent.
//!
//! # Environment Variables
//!
//! ## Required Variables
//! - `AZURE_STORAGE_ACCOUNT_NAME`: storage account name
//! - `AZURE_STORAGE_IMAGE_CONTAINER`: container receiving the originals
//!
//! ## Optional Variables
//! - `AZURE_STORAGE_ACCOUNT_KEY`: shared key used when managed identity is unusable
//! - `AZURE_STORAGE_THUMBNAIL_CONTAINER`: enables thumbnails when set
//! - `AZURE_STORAGE_BLOB_ENDPOINT`: blob endpoint (default: `https://{account}.blob.core.windows.net`)
//! - `THUMBNAIL_LINK_MODE`: `signed` or `plain` (default: `signed`)
//! - `THUMBNAIL_FORMAT`: `png` or `source` (default: `png`)
//! - `STORAGE_TIMEOUT_SECS`: deadline for each storage or codec call (default: 30)
//! - `IDENTITY_TIMEOUT_SECS`: deadline for the identity endpoint (default: 5)
//! - `IDENTITY_ENDPOINT` / `IDENTITY_HEADER`: App Service identity endpoint and its secret
//! - `AZURE_CLIENT_ID`: client id of a user-assigned identity
//! - `HOST`: server bind address (default: "0.0.0.0")
//! - `PORT`: server port (default: 3000)
//! - `MAX_UPLOAD_BYTES`: request body limit (default: 20 MiB)
//! - `REQUEST_TIMEOUT_SECS`: whole-request deadline (default: 120)
//! - `CORS_ALLOWED_ORIGINS`: comma separated origins allowed in release builds
//! - `STATIC_DIR`: front-end assets (default: "./wwwroot")
//! - `RUST_LOG`: logging filter (default: "info,image_gallery=debug,tower_http=debug")

use crate::domain::storage::config::{LinkMode, StorageConfig, ThumbnailFormat};
use std::{fmt, time::Duration};

/// Complete server configuration loaded from environment.
#[derive(Clone)]
pub struct Config {
    /// Account, key and container names
    pub storage: StorageConfig,

    /// Blob service endpoint override, e.g. an Azurite URL
    pub blob_endpoint: Option<String>,

    pub link_mode: LinkMode,

    pub thumbnail_format: ThumbnailFormat,

    pub storage_timeout_secs: u64,

    pub identity_timeout_secs: u64,

    pub identity_endpoint: Option<String>,

    /// Secret guarding the App Service identity endpoint
    pub identity_header: Option<String>,

    pub client_id: Option<String>,

    /// Server bind address
    pub host: String,

    /// Server port
    pub port: u16,

    pub max_upload_bytes: usize,

    pub request_timeout_secs: u64,

    pub cors_allowed_origins: Vec<String>,

    pub static_dir: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value cannot be
    /// parsed, or the storage names fail validation.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage = StorageConfig::new(
            env_required(&lookup, "AZURE_STORAGE_ACCOUNT_NAME")?,
            lookup("AZURE_STORAGE_ACCOUNT_KEY"),
            env_required(&lookup, "AZURE_STORAGE_IMAGE_CONTAINER")?,
            lookup("AZURE_STORAGE_THUMBNAIL_CONTAINER"),
        )
        .map_err(|e| anyhow::anyhow!("Invalid storage configuration: {}", e))?;

        Ok(Self {
            storage,
            blob_endpoint: lookup("AZURE_STORAGE_BLOB_ENDPOINT"),
            link_mode: env_or(&lookup, "THUMBNAIL_LINK_MODE", LinkMode::default())?,
            thumbnail_format: env_or(&lookup, "THUMBNAIL_FORMAT", ThumbnailFormat::default())?,
            storage_timeout_secs: env_or(&lookup, "STORAGE_TIMEOUT_SECS", 30)?,
            identity_timeout_secs: env_or(&lookup, "IDENTITY_TIMEOUT_SECS", 5)?,
            identity_endpoint: lookup("IDENTITY_ENDPOINT"),
            identity_header: lookup("IDENTITY_HEADER"),
            client_id: lookup("AZURE_CLIENT_ID"),
            host: env_or(&lookup, "HOST", "0.0.0.0".to_string())?,
            port: env_or(&lookup, "PORT", 3000)?,
            max_upload_bytes: env_or(&lookup, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
            request_timeout_secs: env_or(&lookup, "REQUEST_TIMEOUT_SECS", 120)?,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            static_dir: env_or(&lookup, "STATIC_DIR", "./wwwroot".to_string())?,
        })
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }

    pub fn identity_timeout(&self) -> Duration {
        Duration::from_secs(self.identity_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("storage", &self.storage)
            .field("blob_endpoint", &self.blob_endpoint)
            .field("link_mode", &self.link_mode)
            .field("thumbnail_format", &self.thumbnail_format)
            .field("storage_timeout_secs", &self.storage_timeout_secs)
            .field("identity_timeout_secs", &self.identity_timeout_secs)
            .field("identity_endpoint", &self.identity_endpoint)
            .field("identity_header", &self.identity_header.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

/// Load a required variable.
///
/// # Errors
///
/// Returns an error if the variable is not set.
fn env_required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    lookup(key).ok_or_else(|| anyhow::anyhow!("Missing required environment variable: {}", key))
}

/// Load a variable with a default value.
///
/// # Errors
///
/// Returns an error if the variable is set but cannot be parsed.
fn env_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", key, e)),
        None => Ok(default),
    }
}
