//! REST key-value store
//!
//! Speaks the Redis-over-HTTP protocol: each command is POSTed as a JSON array
//! (`["GET", key]`) with a bearer token, and every reply has the canonical
//! shape `{"result": T}` or `{"error": "message"}`. [`unwrap_result`] is the
//! only place that shape is interpreted.

use crate::error::StoreError;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

const STORE_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const STORE_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SCAN_START_CURSOR: &str = "0";

pub struct RestKeyValueStore {
    client: Client,
    url: String,
    token: String,
    scan_count: u32,
}

impl RestKeyValueStore {
    pub fn new(url: String, token: String, scan_count: u32) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(STORE_HTTP_CONNECT_TIMEOUT)
            .timeout(STORE_HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Backend(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token,
            scan_count: scan_count.max(1),
        })
    }

    async fn command(&self, args: Value) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("Store request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::Unauthorized(format!("{}: {}", status, text)));
        }

        // Error replies carry `{"error": ...}` bodies even on non-2xx statuses.
        let body: Value = response.json().await.map_err(|e| {
            StoreError::Serialization(format!("Store reply with status {} is not JSON: {}", status, e))
        })?;
        unwrap_result(body)
    }
}

/// Map the canonical `{"result": T}` reply shape to `T`.
pub fn unwrap_result(body: Value) -> Result<Value, StoreError> {
    match body {
        Value::Object(mut map) => {
            if let Some(error) = map.remove("error") {
                let message = match error {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                return Err(StoreError::Backend(message));
            }
            map.remove("result").ok_or_else(|| {
                StoreError::Serialization("Store reply has neither 'result' nor 'error'".to_string())
            })
        }
        other => Err(StoreError::Serialization(format!(
            "Store reply is not an object: {}",
            other
        ))),
    }
}

/// Stored values are text; a backend that hands back parsed JSON gets it re-encoded.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Escape glob metacharacters so a key prefix matches literally.
fn glob_escape(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('*');
    out
}

/// `SET ... NX` replies `"OK"` when the key was written and null when it existed.
fn parse_conditional_set(key: &str, result: Value) -> Result<bool, StoreError> {
    match result {
        Value::Null => Ok(false),
        Value::String(ref s) if s == "OK" => Ok(true),
        other => Err(StoreError::Backend(format!(
            "SET {} NX was not acknowledged: {}",
            key, other
        ))),
    }
}

/// Split a SCAN reply `[cursor, [keys...]]`.
fn parse_scan_page(result: Value) -> Result<(String, Vec<String>), StoreError> {
    let malformed = || StoreError::Serialization("Malformed SCAN reply".to_string());
    let Value::Array(mut parts) = result else {
        return Err(malformed());
    };
    if parts.len() != 2 {
        return Err(malformed());
    }
    let keys = match parts.pop() {
        Some(Value::Array(keys)) => keys
            .into_iter()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect(),
        _ => return Err(malformed()),
    };
    let cursor = match parts.pop() {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(malformed()),
    };
    Ok((cursor, keys))
}

#[async_trait]
impl KeyValueStore for RestKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self.command(json!(["GET", key])).await?;
        Ok(value_to_text(result))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let result = self.command(json!(["SET", key, value])).await?;
        match result.as_str() {
            Some("OK") => Ok(()),
            _ => Err(StoreError::Backend(format!(
                "SET {} was not acknowledged: {}",
                key, result
            ))),
        }
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let result = self.command(json!(["SET", key, value, "NX"])).await?;
        parse_conditional_set(key, result)
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let pattern = glob_escape(prefix);
        let mut cursor = SCAN_START_CURSOR.to_string();
        let mut keys = BTreeSet::new();
        let mut pages = 0usize;

        loop {
            let result = self
                .command(json!(["SCAN", cursor, "MATCH", pattern, "COUNT", self.scan_count]))
                .await?;
            let (next, page) = parse_scan_page(result)?;
            pages += 1;
            keys.extend(page.into_iter().filter(|k| k.starts_with(prefix)));
            if next == SCAN_START_CURSOR {
                break;
            }
            cursor = next;
        }

        debug!(prefix, pages, keys = keys.len(), "REST scan complete");
        Ok(keys.into_iter().collect())
    }

    fn backend_name(&self) -> &str {
        "rest"
    }
}
