//! Image metadata produced by the extractor, one record per image file.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Suggested physical size for one print format
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrintSize {
    pub long: f64,
    pub short: f64,
}

/// Extractor output for a single image.
///
/// Width and height are signed and optional so that bad records load and can
/// be rejected per entry instead of failing the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub file: String,

    #[serde(default)]
    pub width: Option<i64>,

    #[serde(default)]
    pub height: Option<i64>,

    #[serde(default)]
    pub print_sizes: BTreeMap<String, PrintSize>,

    #[serde(default)]
    pub resolution_warnings: BTreeMap<String, bool>,

    #[serde(default)]
    pub year: Option<i32>,
}

impl ImageMetadata {
    /// Stable id: the file name without its extension.
    pub fn id(&self) -> String {
        image_id(&self.file)
    }

    /// Pixel size, when both sides are present and positive.
    pub fn pixel_size(&self) -> Option<(u32, u32)> {
        let width = u32::try_from(self.width?).ok()?;
        let height = u32::try_from(self.height?).ok()?;
        (width > 0 && height > 0).then_some((width, height))
    }
}

/// Derive an image id from a file name: directories and extension stripped.
pub fn image_id(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}

/// Parse extractor output from JSON text.
pub fn parse_metadata(source: &str, text: &str) -> Result<Vec<ImageMetadata>, CatalogError> {
    serde_json::from_str(text).map_err(|e| CatalogError::SourceUnreadable {
        path: source.to_string(),
        reason: e.to_string(),
    })
}

/// Read extractor output from disk, failing before any store is touched.
pub fn load_metadata(path: &Path) -> Result<Vec<ImageMetadata>, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|e| CatalogError::SourceUnreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_metadata(&path.display().to_string(), &text)
}
