//! Key-Value Store
//!
//! Narrow interface over the shared key-value store: single-key get and set
//! plus prefix scans. A single `set` is atomic; nothing here offers cross-key
//! transactions, so concurrent writers to the same key are last-writer-wins.
//! `set_if_absent` is the one conditional write: it claims a key atomically
//! and is how backup keys stay unique across processes.

pub mod memory;
pub mod persistence;
pub mod rest;
pub mod snapshot;

pub use memory::MemoryKeyValueStore;
pub use persistence::SledKeyValueStore;
pub use rest::RestKeyValueStore;
pub use snapshot::{
    BackupInfo, DamagedEntry, LoadedCatalog, SnapshotStore, BACKUP_PREFIX, CATALOG_KEY,
};

use crate::error::{ApiError, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key-value store interface
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Write `value` only if `key` does not exist yet. Returns false, leaving
    /// the stored value untouched, when the key was already taken.
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Every key starting with `prefix`, sorted. Pagination is internal.
    async fn scan(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    fn backend_name(&self) -> &str;
}

/// Store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sled,
    Rest,
    Memory,
}

/// Which credential set the REST backend uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreEnvironment {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for StoreEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(StoreEnvironment::Development),
            "production" | "prod" => Ok(StoreEnvironment::Production),
            other => Err(format!(
                "Unknown store environment '{}' (expected 'development' or 'production')",
                other
            )),
        }
    }
}

/// REST endpoint and bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestCredentials {
    pub url: String,
    pub token: String,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// sled database directory; relative paths resolve against the workspace
    #[serde(default)]
    pub sled_path: Option<PathBuf>,

    #[serde(default)]
    pub environment: StoreEnvironment,

    #[serde(default)]
    pub development: Option<RestCredentials>,

    #[serde(default)]
    pub production: Option<RestCredentials>,

    /// Page size hint for REST scans
    #[serde(default = "default_scan_count")]
    pub scan_count: u32,
}

fn default_scan_count() -> u32 {
    100
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sled_path: None,
            environment: StoreEnvironment::default(),
            development: None,
            production: None,
            scan_count: default_scan_count(),
        }
    }
}

impl StoreConfig {
    /// Credentials for the selected environment.
    pub fn credentials(&self) -> Result<&RestCredentials, String> {
        let (name, creds) = match self.environment {
            StoreEnvironment::Development => ("development", self.development.as_ref()),
            StoreEnvironment::Production => ("production", self.production.as_ref()),
        };
        creds.ok_or_else(|| format!("No REST credentials configured for the {} environment", name))
    }

    pub fn resolve_sled_path(&self, workspace_root: &Path) -> PathBuf {
        match &self.sled_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => workspace_root.join(path),
            None => workspace_root.join(".darkroom").join("store"),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.scan_count == 0 {
            return Err("scan_count must be at least 1".to_string());
        }
        if self.backend == StoreBackend::Rest {
            let creds = self.credentials()?;
            if !creds.url.starts_with("http://") && !creds.url.starts_with("https://") {
                return Err(format!("REST store URL '{}' must be http(s)", creds.url));
            }
            if creds.token.is_empty() {
                return Err("REST store token cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Open the configured backend.
pub fn open_store(
    config: &StoreConfig,
    workspace_root: &Path,
) -> Result<Arc<dyn KeyValueStore>, ApiError> {
    match config.backend {
        StoreBackend::Sled => {
            let path = config.resolve_sled_path(workspace_root);
            std::fs::create_dir_all(&path).map_err(StoreError::Io)?;
            Ok(Arc::new(SledKeyValueStore::new(&path)?))
        }
        StoreBackend::Rest => {
            let creds = config.credentials().map_err(ApiError::ConfigError)?;
            Ok(Arc::new(RestKeyValueStore::new(
                creds.url.clone(),
                creds.token.clone(),
                config.scan_count,
            )?))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryKeyValueStore::new())),
    }
}
