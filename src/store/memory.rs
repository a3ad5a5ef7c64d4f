//! In-process key-value store for tests and dry runs.
//!
//! Records every successful write in order and can be told to fail reads or
//! writes for keys matching a prefix.

use crate::error::StoreError;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, String>>,
    write_log: Mutex<Vec<String>>,
    failing_reads: Mutex<Option<String>>,
    failing_writes: Mutex<Option<String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        store
            .entries
            .write()
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        store
    }

    /// Make every `get` of a key starting with `prefix` fail.
    pub fn fail_reads_matching(&self, prefix: &str) {
        *self.failing_reads.lock() = Some(prefix.to_string());
    }

    /// Make every `set` of a key starting with `prefix` fail.
    pub fn fail_writes_matching(&self, prefix: &str) {
        *self.failing_writes.lock() = Some(prefix.to_string());
    }

    pub fn clear_failures(&self) {
        *self.failing_reads.lock() = None;
        *self.failing_writes.lock() = None;
    }

    /// Keys of successful writes, oldest first.
    pub fn write_log(&self) -> Vec<String> {
        self.write_log.lock().clone()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().clone()
    }

    fn check(rule: &Mutex<Option<String>>, key: &str, op: &str) -> Result<(), StoreError> {
        match rule.lock().as_deref() {
            Some(prefix) if key.starts_with(prefix) => Err(StoreError::Backend(format!(
                "injected {} failure for {}",
                op, key
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::check(&self.failing_reads, key, "read")?;
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::check(&self.failing_writes, key, "write")?;
        self.entries.write().insert(key.to_string(), value.to_string());
        self.write_log.lock().push(key.to_string());
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        Self::check(&self.failing_writes, key, "write")?;
        let mut entries = self.entries.write();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        self.write_log.lock().push(key.to_string());
        Ok(true)
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
