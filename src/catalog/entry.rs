//! Catalog entry domain types.

use crate::pricing::Orientation;
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Ordered sequence of entries keyed by `id`
pub type Catalog = Vec<CatalogEntry>;

/// Print run for one format code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edition {
    #[serde(deserialize_with = "print_count")]
    pub total: u32,
    #[serde(default, deserialize_with = "print_count")]
    pub sold: u32,
}

impl Edition {
    pub const fn new(total: u32) -> Self {
        Self { total, sold: 0 }
    }
}

/// One item in the public gallery.
///
/// Curator-owned: `title`, `location`, `description`, `tags`, `exhibitions`,
/// `visible`, `year`, `print_editions`. Everything else is recomputed from
/// the image files on every update. Every field defaults when absent so
/// partially curated documents still load; unknown keys land in `extra`
/// and are written back untouched. Extractor-owned fields with a value of
/// the wrong type read as their default, since the next update recomputes
/// them anyway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,

    #[serde(default, deserialize_with = "lenient")]
    pub filename: String,

    #[serde(default, deserialize_with = "lenient")]
    pub thumbnail_path: String,

    #[serde(default, deserialize_with = "lenient")]
    pub width: u32,

    #[serde(default, deserialize_with = "lenient")]
    pub height: u32,

    #[serde(default, deserialize_with = "lenient")]
    pub aspect_ratio: f64,

    #[serde(default, deserialize_with = "lenient")]
    pub orientation: Orientation,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub exhibitions: Vec<String>,

    #[serde(default = "default_visible")]
    pub visible: bool,

    #[serde(default, deserialize_with = "lenient")]
    pub print_formats: BTreeSet<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub dimensions: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "lenient")]
    pub price_details: BTreeMap<String, Option<String>>,

    #[serde(default)]
    pub print_editions: BTreeMap<String, Edition>,

    #[serde(default, deserialize_with = "lenient")]
    pub resolution_warnings: BTreeMap<String, bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_visible() -> bool {
    true
}

/// Keys with a typed field on [`CatalogEntry`]; everything else is `extra`.
const KNOWN_FIELDS: &[&str] = &[
    "id",
    "title",
    "location",
    "description",
    "year",
    "filename",
    "thumbnailPath",
    "width",
    "height",
    "aspectRatio",
    "orientation",
    "tags",
    "exhibitions",
    "visible",
    "printFormats",
    "dimensions",
    "priceDetails",
    "printEditions",
    "resolutionWarnings",
];

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Years written as numbers or numeric strings.
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let year = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(year.and_then(|y| i32::try_from(y).ok()))
}

/// Non-negative whole counts, also accepting `4.0` and `"4"`.
fn print_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let count = match &value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    count
        .and_then(|c| u32::try_from(c).ok())
        .ok_or_else(|| D::Error::custom(format!("expected a print count, got {}", value)))
}

fn field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<T> {
    T::deserialize(object.get(key)?).ok()
}

impl CatalogEntry {
    /// An entry with only an id; every other field at its default.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            location: String::new(),
            description: String::new(),
            year: None,
            filename: String::new(),
            thumbnail_path: String::new(),
            width: 0,
            height: 0,
            aspect_ratio: 0.0,
            orientation: Orientation::default(),
            tags: Vec::new(),
            exhibitions: Vec::new(),
            visible: default_visible(),
            print_formats: BTreeSet::new(),
            dimensions: BTreeMap::new(),
            price_details: BTreeMap::new(),
            print_editions: BTreeMap::new(),
            resolution_warnings: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// Salvage a stored entry that did not deserialize as a whole.
    ///
    /// Keeps the id, every curator field that parses on its own, each
    /// edition that parses and the unknown keys. Extractor fields are left
    /// at their defaults. `None` when there is no string id to key on.
    pub fn recover(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let id = object.get("id")?.as_str()?;
        let mut entry = Self::new(id);

        if let Some(title) = field(object, "title") {
            entry.title = title;
        }
        if let Some(location) = field(object, "location") {
            entry.location = location;
        }
        if let Some(description) = field(object, "description") {
            entry.description = description;
        }
        if let Some(year) = object.get("year") {
            entry.year = lenient_year(year).unwrap_or(None);
        }
        if let Some(tags) = field(object, "tags") {
            entry.tags = tags;
        }
        if let Some(exhibitions) = field(object, "exhibitions") {
            entry.exhibitions = exhibitions;
        }
        if let Some(visible) = field(object, "visible") {
            entry.visible = visible;
        }
        if let Some(editions) = object.get("printEditions").and_then(Value::as_object) {
            entry.print_editions = editions
                .iter()
                .filter_map(|(code, edition)| {
                    Some((code.clone(), Edition::deserialize(edition).ok()?))
                })
                .collect();
        }
        entry.extra = object
            .iter()
            .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Some(entry)
    }

    /// Total prints sold across every edition.
    pub fn sold_count(&self) -> u32 {
        self.print_editions.values().map(|e| e.sold).sum()
    }
}

/// Ids of a catalog, in catalog order.
pub fn catalog_ids(catalog: &[CatalogEntry]) -> Vec<&str> {
    catalog.iter().map(|e| e.id.as_str()).collect()
}
