//! Text canonicalization for persisted catalog documents.
//!
//! Strings are normalized to NFKC, line and paragraph separators become `\n`
//! and non-breaking spaces become plain spaces. Normalization runs on the
//! JSON value tree, not on the serialized text, so escaped separators stay
//! valid JSON.

use crate::catalog::entry::CatalogEntry;
use crate::error::StoreError;
use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

const LINE_SEPARATOR: char = '\u{2028}';
const PARAGRAPH_SEPARATOR: char = '\u{2029}';
const NO_BREAK_SPACE: char = '\u{00A0}';
const NARROW_NO_BREAK_SPACE: char = '\u{202F}';

/// Canonicalize a single string.
pub fn normalize_text(text: &str) -> String {
    text.nfkc()
        .map(|c| match c {
            LINE_SEPARATOR | PARAGRAPH_SEPARATOR => '\n',
            NO_BREAK_SPACE | NARROW_NO_BREAK_SPACE => ' ',
            other => other,
        })
        .collect()
}

/// Canonicalize every string and object key in a JSON tree.
pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(normalize_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (normalize_text(&k), normalize_value(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Serialize a catalog into its canonical persisted form.
pub fn canonical_catalog_json(catalog: &[CatalogEntry]) -> Result<String, StoreError> {
    let value = serde_json::to_value(catalog).map_err(|e| StoreError::Serialization(e.to_string()))?;
    serde_json::to_string(&normalize_value(value)).map_err(|e| StoreError::Serialization(e.to_string()))
}
