//! Error types for the darkroom gallery backend.

use thiserror::Error;

/// Key-value store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Failed to encode or decode stored value: {0}")]
    Serialization(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal catalog update errors.
///
/// Per-entry problems (missing assets, bad dimensions) are reported as
/// [`crate::catalog::MergeWarning`] values instead.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Image metadata at {path} is unreadable: {reason}")]
    SourceUnreadable { path: String, reason: String },

    #[error("Backup write to {key} failed, live catalog left untouched: {source}")]
    BackupFailed {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Catalog write failed: {0}")]
    CatalogWriteFailed(#[source] StoreError),

    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    #[error("Backup {key} is not a valid catalog: {reason}")]
    InvalidBackup { key: String, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Top-level errors surfaced by services and CLI routes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
