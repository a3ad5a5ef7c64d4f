//! Snapshot Store Adapter
//!
//! Owns the key layout of persisted catalogs:
//!
//! - `gallery:json`: the live catalog, a JSON array of entries
//! - `gallery:backup:<unixMillis>[-<n>]`: immutable copies of earlier catalogs
//!
//! Backups are append-only. Keys are strictly increasing within a process.
//! Each key is claimed with an atomic `set_if_absent`; a key another writer
//! already holds is retried with a numeric suffix, so concurrent updates
//! from separate processes never overwrite each other's backups.

use crate::catalog::normalize::canonical_catalog_json;
use crate::catalog::{Catalog, CatalogEntry};
use crate::error::{CatalogError, StoreError};
use crate::store::KeyValueStore;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CATALOG_KEY: &str = "gallery:json";
pub const BACKUP_PREFIX: &str = "gallery:backup:";

const MAX_KEY_SUFFIX: u32 = 1000;

/// The live catalog as read from the store
#[derive(Debug, Clone, Default)]
pub struct LoadedCatalog {
    /// Stored document, byte for byte
    pub raw: Option<String>,
    pub entries: Catalog,
    /// Entries that only loaded in part, or not at all
    pub damaged: Vec<DamagedEntry>,
}

/// A stored entry that failed to deserialize as a whole
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamagedEntry {
    /// Position in the stored array
    pub index: usize,
    /// Set when the entry was recovered through its id
    pub id: Option<String>,
    pub reason: String,
}

impl LoadedCatalog {
    /// Whether overwriting this document must be preceded by a backup.
    ///
    /// True for any stored document except an empty array, including
    /// documents that failed to parse.
    pub fn needs_backup(&self) -> bool {
        match self.raw.as_deref() {
            None => false,
            Some(_) if !self.entries.is_empty() => true,
            Some(raw) => serde_json::from_str::<Vec<serde_json::Value>>(raw)
                .map(|items| !items.is_empty())
                .unwrap_or(true),
        }
    }
}

/// One backup key and its timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub key: String,
    pub timestamp_ms: i64,
}

impl BackupInfo {
    pub fn from_key(key: &str) -> Option<Self> {
        let rest = key.strip_prefix(BACKUP_PREFIX)?;
        let millis = rest.split('-').next()?;
        let timestamp_ms = millis.parse::<i64>().ok()?;
        Some(Self {
            key: key.to_string(),
            timestamp_ms,
        })
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }
}

/// Strictly increasing millisecond clock for backup keys
#[derive(Debug, Default)]
pub struct BackupClock {
    last: AtomicI64,
}

impl BackupClock {
    /// `max(now_ms, previous + 1)`
    pub fn next(&self, now_ms: i64) -> i64 {
        let mut issued = now_ms;
        let _ = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                issued = now_ms.max(last + 1);
                Some(issued)
            });
        issued
    }
}

pub struct SnapshotStore {
    store: Arc<dyn KeyValueStore>,
    clock: BackupClock,
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            clock: BackupClock::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Read and parse the live catalog. An absent key is an empty catalog.
    pub async fn load_catalog(&self) -> Result<LoadedCatalog, StoreError> {
        let Some(raw) = self.store.get(CATALOG_KEY).await? else {
            return Ok(LoadedCatalog::default());
        };
        let entries: Catalog = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Serialization(format!("{} is not a catalog: {}", CATALOG_KEY, e)))?;
        Ok(LoadedCatalog {
            raw: Some(raw),
            entries,
            damaged: Vec::new(),
        })
    }

    /// Like [`Self::load_catalog`], but never fails: an unreadable key yields
    /// an empty catalog and a document that is not a JSON array keeps its raw
    /// text so it can still be backed up. The swallowed error is returned
    /// alongside. Entries are parsed one at a time, so a damaged entry costs
    /// at most its own unparseable fields.
    pub async fn load_catalog_lenient(&self) -> (LoadedCatalog, Option<StoreError>) {
        let raw = match self.store.get(CATALOG_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return (LoadedCatalog::default(), None),
            Err(e) => return (LoadedCatalog::default(), Some(e)),
        };
        let items = match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(items) => items,
            Err(e) => {
                let error = StoreError::Serialization(format!("{} is not a catalog: {}", CATALOG_KEY, e));
                return (
                    LoadedCatalog {
                        raw: Some(raw),
                        ..LoadedCatalog::default()
                    },
                    Some(error),
                );
            }
        };

        let (entries, damaged) = parse_entries(items);
        (
            LoadedCatalog {
                raw: Some(raw),
                entries,
                damaged,
            },
            None,
        )
    }

    /// Copy a catalog document verbatim to a fresh backup key.
    pub async fn write_backup(&self, raw: &str) -> Result<String, CatalogError> {
        let millis = self.clock.next(Utc::now().timestamp_millis());
        let base = format!("{}{}", BACKUP_PREFIX, millis);
        for n in 0..=MAX_KEY_SUFFIX {
            let key = backup_key_candidate(&base, n);
            let claimed = self
                .store
                .set_if_absent(&key, raw)
                .await
                .map_err(|source| CatalogError::BackupFailed {
                    key: key.clone(),
                    source,
                })?;
            if claimed {
                info!(key = %key, bytes = raw.len(), "Catalog backup written");
                return Ok(key);
            }
            debug!(key = %key, "Backup key taken, trying next suffix");
        }
        Err(CatalogError::BackupFailed {
            key: format!("{}*", base),
            source: StoreError::Backend(format!(
                "No free backup key under {} after {} attempts",
                base, MAX_KEY_SUFFIX
            )),
        })
    }

    /// Write the live catalog in canonical form.
    pub async fn write_catalog(&self, catalog: &[CatalogEntry]) -> Result<(), CatalogError> {
        let json = canonical_catalog_json(catalog).map_err(CatalogError::CatalogWriteFailed)?;
        self.store
            .set(CATALOG_KEY, &json)
            .await
            .map_err(CatalogError::CatalogWriteFailed)?;
        info!(items = catalog.len(), "Catalog written");
        Ok(())
    }

    /// Backups, newest first. Keys that do not parse are skipped.
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>, StoreError> {
        let keys = self.store.scan(BACKUP_PREFIX).await?;
        let mut backups: Vec<BackupInfo> = keys
            .iter()
            .filter_map(|key| {
                let info = BackupInfo::from_key(key);
                if info.is_none() {
                    warn!(key = %key, "Ignoring malformed backup key");
                }
                info
            })
            .collect();
        backups.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms).then_with(|| b.key.cmp(&a.key)));
        Ok(backups)
    }

    pub async fn load_backup_raw(&self, key: &str) -> Result<String, CatalogError> {
        if !key.starts_with(BACKUP_PREFIX) {
            return Err(CatalogError::BackupNotFound(key.to_string()));
        }
        self.store
            .get(key)
            .await?
            .ok_or_else(|| CatalogError::BackupNotFound(key.to_string()))
    }

    pub async fn load_backup(&self, key: &str) -> Result<Catalog, CatalogError> {
        let raw = self.load_backup_raw(key).await?;
        serde_json::from_str(&raw).map_err(|e| CatalogError::InvalidBackup {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

fn backup_key_candidate(base: &str, n: u32) -> String {
    if n == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, n)
    }
}

fn parse_entries(items: Vec<Value>) -> (Catalog, Vec<DamagedEntry>) {
    let mut entries = Vec::with_capacity(items.len());
    let mut damaged = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let error = match CatalogEntry::deserialize(&item) {
            Ok(entry) => {
                entries.push(entry);
                continue;
            }
            Err(e) => e,
        };
        let recovered = CatalogEntry::recover(&item);
        let id = recovered.as_ref().map(|entry| entry.id.clone());
        warn!(index, id = ?id, error = %error, "Stored catalog entry is damaged");
        if let Some(entry) = recovered {
            entries.push(entry);
        }
        damaged.push(DamagedEntry {
            index,
            id,
            reason: error.to_string(),
        });
    }
    (entries, damaged)
}
