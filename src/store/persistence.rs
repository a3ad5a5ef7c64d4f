//! sled-backed local key-value store

use crate::error::StoreError;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use std::io;
use std::path::Path;

/// Local store used for development and single-host deployments
pub struct SledKeyValueStore {
    db: sled::Db,
}

impl SledKeyValueStore {
    /// Open (or create) a sled database at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| {
            StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Ok(Self { db })
    }

    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }
}

#[async_trait]
impl KeyValueStore for SledKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(raw) = self.db.get(key.as_bytes()).map_err(to_store_io)? else {
            return Ok(None);
        };
        let text = String::from_utf8(raw.to_vec())
            .map_err(|e| StoreError::Serialization(format!("Value for {} is not UTF-8: {}", key, e)))?;
        Ok(Some(text))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(to_store_io)?;
        // Callers rely on a returned set being durable (backup-before-overwrite).
        self.db.flush().map_err(to_store_io)?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let swapped = self
            .db
            .compare_and_swap(key.as_bytes(), None as Option<&[u8]>, Some(value.as_bytes()))
            .map_err(to_store_io)?;
        if swapped.is_err() {
            return Ok(false);
        }
        self.db.flush().map_err(to_store_io)?;
        Ok(true)
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item.map_err(to_store_io)?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }

    fn backend_name(&self) -> &str {
        "sled"
    }
}

fn to_store_io(err: sled::Error) -> StoreError {
    StoreError::Io(io::Error::new(io::ErrorKind::Other, err.to_string()))
}
