//! Default templates for entries seen for the first time.

use crate::catalog::entry::Edition;
use crate::pricing::ARTIST_PROOF;
use std::collections::BTreeMap;

/// Print runs given to an image on its first appearance.
pub const DEFAULT_EDITIONS: [(&str, Edition); 3] = [
    ("L", Edition::new(5)),
    ("XL", Edition::new(3)),
    (ARTIST_PROOF, Edition::new(2)),
];

/// Curator fields for an image nobody has curated yet
#[derive(Debug, Clone, PartialEq)]
pub struct CuratorDefaults {
    pub title: String,
    pub location: String,
    pub description: String,
    pub tags: Vec<String>,
    pub exhibitions: Vec<String>,
    pub visible: bool,
}

impl CuratorDefaults {
    pub fn for_id(id: &str) -> Self {
        Self {
            title: default_title(id),
            location: String::new(),
            description: String::new(),
            tags: Vec::new(),
            exhibitions: Vec::new(),
            visible: true,
        }
    }
}

pub fn default_editions() -> BTreeMap<String, Edition> {
    DEFAULT_EDITIONS
        .iter()
        .map(|(code, edition)| (code.to_string(), *edition))
        .collect()
}

/// `"golden-hour_pier"` becomes `"Golden Hour Pier"`.
pub fn default_title(id: &str) -> String {
    id.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
