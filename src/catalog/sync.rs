//! Catalog update protocol.
//!
//! 1. Load new metadata (failure aborts before the store is touched).
//! 2. Read `gallery:json`; an unreadable catalog counts as empty. Damaged
//!    entries are salvaged one by one so curator fields survive.
//! 3. Merge.
//! 4. Back up the previous catalog if it was non-empty. A failed backup aborts.
//! 5. Write the new catalog.
//!
//! No lock spans these steps. Two overlapping updates both write backups and
//! the later catalog write wins.

use crate::assets::{AssetCheck, AssetLayout};
use crate::captions::CaptionIndex;
use crate::catalog::merge::{merge, MergeContext, MergeWarning};
use crate::catalog::metadata::{load_metadata, ImageMetadata};
use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::pricing::PricingPolicy;
use crate::store::{LoadedCatalog, SnapshotStore};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of a catalog update
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub item_count: usize,
    pub previous_count: usize,
    pub missing_ids: BTreeSet<String>,
    pub warnings: Vec<MergeWarning>,
    pub backup_key: Option<String>,
    /// The previous catalog could not be read, so it was not backed up
    pub previous_read_failed: bool,
    pub dry_run: bool,
}

impl UpdateReport {
    pub fn dropped_count(&self) -> usize {
        self.warnings.iter().filter(|w| w.drops_entry()).count()
    }
}

/// Outcome of restoring a backup
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub restored_from: String,
    pub item_count: usize,
    /// Backup of the catalog the restore replaced
    pub backup_key: Option<String>,
}

pub struct CatalogSync {
    snapshots: SnapshotStore,
    pricing: PricingPolicy,
    layout: AssetLayout,
    assets: Arc<dyn AssetCheck>,
}

impl CatalogSync {
    pub fn new(
        snapshots: SnapshotStore,
        pricing: PricingPolicy,
        layout: AssetLayout,
        assets: Arc<dyn AssetCheck>,
    ) -> Self {
        Self {
            snapshots,
            pricing,
            layout,
            assets,
        }
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Regenerate the catalog from the extractor's metadata file.
    #[instrument(skip(self, captions), fields(metadata = %metadata_path.display()))]
    pub async fn run_catalog_update(
        &self,
        metadata_path: &Path,
        captions: &CaptionIndex,
        dry_run: bool,
    ) -> Result<UpdateReport, CatalogError> {
        let metadata = load_metadata(metadata_path)?;
        info!(records = metadata.len(), "Image metadata loaded");
        self.update_from_metadata(&metadata, captions, dry_run).await
    }

    /// Steps 2-5 of the update protocol for already parsed metadata.
    pub async fn update_from_metadata(
        &self,
        metadata: &[ImageMetadata],
        captions: &CaptionIndex,
        dry_run: bool,
    ) -> Result<UpdateReport, CatalogError> {
        let mut warnings = Vec::new();
        let (previous, read_error) = self.snapshots.load_catalog_lenient().await;
        let previous_read_failed = read_error.is_some() && previous.raw.is_none();
        match read_error {
            Some(e) if previous_read_failed => {
                warn!(error = %e, "Previous catalog unreadable, it will be overwritten without a backup");
                warnings.push(MergeWarning::PreviousCatalogUnreadable {
                    reason: e.to_string(),
                });
            }
            Some(e) => {
                warn!(error = %e, "Previous catalog unparseable, merging against an empty catalog");
                warnings.push(MergeWarning::PreviousCatalogUnparseable {
                    reason: e.to_string(),
                });
            }
            None => {}
        }
        warnings.extend(previous.damaged.iter().map(|damaged| match &damaged.id {
            Some(id) => MergeWarning::PreviousEntryRecovered {
                id: id.clone(),
                reason: damaged.reason.clone(),
            },
            None => MergeWarning::PreviousEntryDropped {
                index: damaged.index,
                reason: damaged.reason.clone(),
            },
        }));

        let ctx = MergeContext {
            pricing: &self.pricing,
            layout: &self.layout,
            assets: self.assets.as_ref(),
            captions,
        };
        let outcome = merge(metadata, &previous.entries, &ctx);
        warnings.extend(outcome.warnings);

        let mut report = UpdateReport {
            item_count: outcome.catalog.len(),
            previous_count: previous.entries.len(),
            missing_ids: outcome.missing_ids,
            warnings,
            backup_key: None,
            previous_read_failed,
            dry_run,
        };

        if dry_run {
            info!(items = report.item_count, "Dry run, store left untouched");
            return Ok(report);
        }

        report.backup_key = self.replace_catalog(&previous, &outcome.catalog).await?;
        Ok(report)
    }

    /// Make a backup the live catalog, backing up the current one first.
    #[instrument(skip(self))]
    pub async fn restore_backup(&self, key: &str) -> Result<RestoreReport, CatalogError> {
        let restored = self.snapshots.load_backup(key).await?;
        let (current, read_error) = self.snapshots.load_catalog_lenient().await;
        match read_error {
            // Nothing to back up if the live key could not even be read.
            Some(e) if current.raw.is_none() => return Err(e.into()),
            Some(e) => warn!(error = %e, "Live catalog unparseable, backing it up verbatim"),
            None => {}
        }
        let backup_key = self.replace_catalog(&current, &restored).await?;
        info!(from = %key, items = restored.len(), "Backup restored");

        Ok(RestoreReport {
            restored_from: key.to_string(),
            item_count: restored.len(),
            backup_key,
        })
    }

    /// The live catalog, strictly parsed.
    pub async fn current_catalog(&self) -> Result<Catalog, CatalogError> {
        Ok(self.snapshots.load_catalog().await?.entries)
    }

    /// Backup-then-overwrite. The live catalog is only written after the
    /// backup write has returned successfully.
    async fn replace_catalog(
        &self,
        previous: &LoadedCatalog,
        catalog: &Catalog,
    ) -> Result<Option<String>, CatalogError> {
        let backup_key = match previous.raw.as_deref() {
            Some(raw) if previous.needs_backup() => Some(self.snapshots.write_backup(raw).await?),
            _ => None,
        };
        self.snapshots.write_catalog(catalog).await?;
        Ok(backup_key)
    }
}
