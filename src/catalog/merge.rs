//! Catalog Merge Engine
//!
//! Reconciles freshly extracted image metadata with the previously persisted
//! catalog. Extractor-owned fields are always recomputed; curator-owned fields
//! are carried over from the previous entry and only fall back to caption
//! suggestions or defaults when the previous entry has nothing.

use crate::assets::{AssetCheck, AssetLayout};
use crate::captions::CaptionIndex;
use crate::catalog::defaults::{default_editions, CuratorDefaults};
use crate::catalog::entry::{Catalog, CatalogEntry};
use crate::catalog::metadata::ImageMetadata;
use crate::pricing::{aspect_ratio, Orientation, PricingPolicy, ARTIST_PROOF};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Non-fatal problem found while updating the catalog
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeWarning {
    #[error("{id}: derivative {path} is missing")]
    AssetMissing { id: String, path: String },

    #[error("{id}: width/height missing or not positive")]
    InvalidDimensions { id: String },

    #[error("{id}: duplicate id in image metadata, later record ignored")]
    DuplicateId { id: String },

    #[error("previous catalog could not be read, overwritten without a backup: {reason}")]
    PreviousCatalogUnreadable { reason: String },

    #[error("previous catalog is not a JSON array, backed up and merged as empty: {reason}")]
    PreviousCatalogUnparseable { reason: String },

    #[error("{id}: stored entry damaged, kept its id and readable curator fields: {reason}")]
    PreviousEntryRecovered { id: String, reason: String },

    #[error("stored entry #{index} has no id and was not carried over: {reason}")]
    PreviousEntryDropped { index: usize, reason: String },
}

impl MergeWarning {
    /// True for warnings that removed an entry from the output.
    pub fn drops_entry(&self) -> bool {
        matches!(
            self,
            MergeWarning::AssetMissing { .. } | MergeWarning::InvalidDimensions { .. }
        )
    }
}

/// Everything the merge reads besides the two catalogs
pub struct MergeContext<'a> {
    pub pricing: &'a PricingPolicy,
    pub layout: &'a AssetLayout,
    pub assets: &'a dyn AssetCheck,
    pub captions: &'a CaptionIndex,
}

/// Result of a merge
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub catalog: Catalog,
    /// Ids present in the previous catalog but absent from the new one
    pub missing_ids: BTreeSet<String>,
    pub warnings: Vec<MergeWarning>,
}

impl MergeOutcome {
    pub fn dropped_count(&self) -> usize {
        self.warnings.iter().filter(|w| w.drops_entry()).count()
    }
}

/// Merge new metadata against the previous catalog.
///
/// Pure: the same inputs always produce the same catalog, in new-metadata order.
pub fn merge(
    new_metadata: &[ImageMetadata],
    previous: &[CatalogEntry],
    ctx: &MergeContext<'_>,
) -> MergeOutcome {
    let mut previous_index: HashMap<&str, &CatalogEntry> = HashMap::with_capacity(previous.len());
    for entry in previous {
        previous_index.entry(entry.id.as_str()).or_insert(entry);
    }

    let mut seen: HashSet<String> = HashSet::with_capacity(new_metadata.len());
    let mut outcome = MergeOutcome::default();

    for item in new_metadata {
        let id = item.id();
        if seen.contains(&id) {
            warn!(id = %id, "Duplicate id in image metadata, skipping");
            outcome.warnings.push(MergeWarning::DuplicateId { id });
            continue;
        }

        let medium = ctx.layout.medium_path(&item.file);
        let thumbnail = ctx.layout.thumbnail_path(&item.file);
        if let Some(path) = [&medium, &thumbnail]
            .into_iter()
            .find(|path| !ctx.assets.exists(path))
        {
            warn!(id = %id, path = %path, "Image derivative missing, dropping entry");
            outcome.warnings.push(MergeWarning::AssetMissing {
                id,
                path: path.clone(),
            });
            continue;
        }

        let Some((width, height)) = item.pixel_size() else {
            warn!(id = %id, width = ?item.width, height = ?item.height, "Invalid dimensions, dropping entry");
            outcome.warnings.push(MergeWarning::InvalidDimensions { id });
            continue;
        };

        // Only an accepted record claims its id.
        seen.insert(id.clone());
        let prev = previous_index.get(id.as_str()).copied();
        debug!(id = %id, carried_over = prev.is_some(), "Composing catalog entry");

        let entry = compose_entry(id, item, prev, (width, height), medium, thumbnail, ctx);
        outcome.catalog.push(entry);
    }

    let output_ids: HashSet<&str> = outcome.catalog.iter().map(|e| e.id.as_str()).collect();
    outcome.missing_ids = previous_index
        .keys()
        .filter(|id| !output_ids.contains(*id))
        .map(|id| id.to_string())
        .collect();

    if !outcome.missing_ids.is_empty() {
        warn!(
            missing = outcome.missing_ids.len(),
            ids = ?outcome.missing_ids,
            "Previously catalogued items are missing from the new catalog"
        );
    }
    info!(
        items = outcome.catalog.len(),
        missing = outcome.missing_ids.len(),
        dropped = outcome.dropped_count(),
        "Catalog merge complete"
    );

    outcome
}

fn compose_entry(
    id: String,
    item: &ImageMetadata,
    prev: Option<&CatalogEntry>,
    (width, height): (u32, u32),
    filename: String,
    thumbnail_path: String,
    ctx: &MergeContext<'_>,
) -> CatalogEntry {
    let defaults = CuratorDefaults::for_id(&id);
    let caption = ctx.captions.get(&id);

    let title = prev
        .map(|p| p.title.clone())
        .filter(|t| !t.is_empty())
        .or_else(|| caption.map(|c| c.title.clone()).filter(|t| !t.is_empty()))
        .unwrap_or(defaults.title);
    let description = prev
        .map(|p| p.description.clone())
        .filter(|d| !d.is_empty())
        .or_else(|| caption.map(|c| c.description.clone()).filter(|d| !d.is_empty()))
        .unwrap_or(defaults.description);
    let tags = prev
        .map(|p| p.tags.clone())
        .filter(|t| !t.is_empty())
        .or_else(|| caption.map(|c| c.tags.clone()).filter(|t| !t.is_empty()))
        .unwrap_or(defaults.tags);

    let location = prev.map(|p| p.location.clone()).unwrap_or(defaults.location);
    let exhibitions = prev
        .map(|p| p.exhibitions.clone())
        .unwrap_or(defaults.exhibitions);
    let visible = prev.map(|p| p.visible).unwrap_or(defaults.visible);
    let print_editions = prev
        .map(|p| p.print_editions.clone())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(default_editions);
    let year = prev.and_then(|p| p.year).or(item.year);
    let extra = prev.map(|p| p.extra.clone()).unwrap_or_default();

    let print_formats: BTreeSet<String> = item.print_sizes.keys().cloned().collect();
    let dimensions: BTreeMap<String, String> = print_formats
        .iter()
        .map(|format| (format.clone(), ctx.pricing.dimensions_label(format, width, height)))
        .collect();
    let price_details = price_details(ctx.pricing, &print_formats);

    CatalogEntry {
        id,
        title,
        location,
        description,
        year,
        filename,
        thumbnail_path,
        width,
        height,
        aspect_ratio: aspect_ratio(width, height),
        orientation: Orientation::from_pixels(width, height),
        tags,
        exhibitions,
        visible,
        print_formats,
        dimensions,
        price_details,
        print_editions,
        resolution_warnings: item.resolution_warnings.clone(),
        extra,
    }
}

fn price_details(
    pricing: &PricingPolicy,
    print_formats: &BTreeSet<String>,
) -> BTreeMap<String, Option<String>> {
    let mut details: BTreeMap<String, Option<String>> = print_formats
        .iter()
        .filter_map(|format| {
            pricing
                .price_for(format)
                .map(|price| (format.clone(), Some(pricing.format_price(price))))
        })
        .collect();
    if !print_formats.is_empty() {
        details.insert(ARTIST_PROOF.to_string(), None);
    }
    details
}
