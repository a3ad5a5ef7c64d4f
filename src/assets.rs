//! Asset Store
//!
//! The resizing pipeline publishes a medium and a thumbnail derivative for
//! every original. The merge engine only needs to ask whether a derivative
//! exists; this module answers that for a local asset tree and audits the
//! tree for files the catalog no longer references.

use crate::catalog::CatalogEntry;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "avif"];

/// Existence check for published image derivatives.
///
/// Paths are public paths such as `/images/gallery/medium/pier.jpg`.
pub trait AssetCheck: Send + Sync {
    fn exists(&self, public_path: &str) -> bool;
}

impl<F> AssetCheck for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn exists(&self, public_path: &str) -> bool {
        self(public_path)
    }
}

/// Where derivatives are published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLayout {
    #[serde(default = "default_medium_prefix")]
    pub medium_prefix: String,

    #[serde(default = "default_thumbnail_prefix")]
    pub thumbnail_prefix: String,
}

fn default_medium_prefix() -> String {
    "/images/gallery/medium".to_string()
}

fn default_thumbnail_prefix() -> String {
    "/images/gallery/thumbnails".to_string()
}

impl Default for AssetLayout {
    fn default() -> Self {
        Self {
            medium_prefix: default_medium_prefix(),
            thumbnail_prefix: default_thumbnail_prefix(),
        }
    }
}

impl AssetLayout {
    pub fn medium_path(&self, file: &str) -> String {
        join_public(&self.medium_prefix, file)
    }

    pub fn thumbnail_path(&self, file: &str) -> String {
        join_public(&self.thumbnail_prefix, file)
    }
}

fn join_public(prefix: &str, file: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), file.trim_start_matches('/'))
}

/// Asset tree on the local filesystem, e.g. a site's `public/` directory
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = dunce::canonicalize(root.as_ref())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a public path onto the asset tree.
    pub fn resolve(&self, public_path: &str) -> PathBuf {
        self.root.join(public_path.trim_start_matches('/'))
    }
}

impl AssetCheck for FsAssetStore {
    fn exists(&self, public_path: &str) -> bool {
        self.resolve(public_path).is_file()
    }
}

/// Image files under the medium directory that no catalog entry references.
pub fn find_orphans(
    store: &FsAssetStore,
    layout: &AssetLayout,
    catalog: &[CatalogEntry],
) -> Vec<String> {
    let referenced: HashSet<&str> = catalog.iter().map(|e| e.filename.as_str()).collect();
    let medium_dir = store.resolve(&layout.medium_prefix);

    let mut orphans: Vec<String> = WalkDir::new(&medium_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_image(entry.path()))
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(&medium_dir).ok()?;
            let public = layout.medium_path(&relative.to_string_lossy().replace('\\', "/"));
            (!referenced.contains(public.as_str())).then_some(public)
        })
        .collect();
    orphans.sort();
    orphans
}

/// Result of checking a catalog against the asset tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetAudit {
    /// `(id, public path)` for every referenced derivative that does not exist
    pub missing: Vec<(String, String)>,
    pub orphans: Vec<String>,
}

impl AssetAudit {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.orphans.is_empty()
    }
}

pub fn audit_catalog(
    store: &FsAssetStore,
    layout: &AssetLayout,
    catalog: &[CatalogEntry],
) -> AssetAudit {
    let missing = catalog
        .iter()
        .flat_map(|entry| {
            [&entry.filename, &entry.thumbnail_path]
                .into_iter()
                .filter(move |path| !store.exists(path))
                .map(move |path| (entry.id.clone(), path.clone()))
        })
        .collect();
    AssetAudit {
        missing,
        orphans: find_orphans(store, layout, catalog),
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
