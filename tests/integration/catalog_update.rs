//! End-to-end catalog updates against a sled store and an on-disk asset tree.

use super::test_utils::{publish_assets, record, write_json};
use darkroom::assets::{AssetCheck, AssetLayout, FsAssetStore};
use darkroom::captions::{Caption, CaptionIndex};
use darkroom::catalog::{CatalogEntry, CatalogSync, MergeWarning};
use darkroom::pricing::PricingPolicy;
use darkroom::store::{KeyValueStore, SledKeyValueStore, SnapshotStore, CATALOG_KEY};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

struct Gallery {
    dir: TempDir,
    store: Arc<SledKeyValueStore>,
    sync: CatalogSync,
}

impl Gallery {
    fn new(published: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        publish_assets(dir.path(), published);
        let store = Arc::new(SledKeyValueStore::new(dir.path().join("store")).unwrap());
        let assets: Arc<dyn AssetCheck> =
            Arc::new(FsAssetStore::new(dir.path().join("public")).unwrap());
        let sync = CatalogSync::new(
            SnapshotStore::new(store.clone()),
            PricingPolicy::default(),
            AssetLayout::default(),
            assets,
        );
        Self { dir, store, sync }
    }

    fn metadata(&self, records: Value) -> std::path::PathBuf {
        let path = self.dir.path().join("data").join("image-metadata.json");
        write_json(&path, &records);
        path
    }

    async fn live(&self) -> Vec<CatalogEntry> {
        let raw = self.store.get(CATALOG_KEY).await.unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}

#[tokio::test]
async fn test_first_update_creates_catalog() {
    let gallery = Gallery::new(&["golden-hour.jpg", "old-pier.jpg"]);
    let path = gallery.metadata(json!([
        record("golden-hour.jpg", 6000, 4000),
        record("old-pier.jpg", 3000, 4500)
    ]));

    let report = gallery
        .sync
        .run_catalog_update(&path, &CaptionIndex::default(), false)
        .await
        .unwrap();
    assert_eq!(report.item_count, 2);
    assert_eq!(report.previous_count, 0);
    assert!(report.backup_key.is_none());
    assert!(report.missing_ids.is_empty());

    let live = gallery.live().await;
    assert_eq!(live[0].id, "golden-hour");
    assert_eq!(live[0].title, "Golden Hour");
    assert_eq!(live[0].filename, "/images/gallery/medium/golden-hour.jpg");
    assert!(live[0].price_details["L"].is_some());
    assert_eq!(live[0].print_editions["XL"].total, 3);
    assert_eq!(live[1].width, 3000);
}

#[tokio::test]
async fn test_curator_edits_survive_and_previous_catalog_is_backed_up() {
    let gallery = Gallery::new(&["golden-hour.jpg"]);
    let path = gallery.metadata(json!([record("golden-hour.jpg", 6000, 4000)]));
    gallery
        .sync
        .run_catalog_update(&path, &CaptionIndex::default(), false)
        .await
        .unwrap();

    // A curator edits the live document by hand, adding a field this tool does not know.
    let mut document: Value =
        serde_json::from_str(&gallery.store.get(CATALOG_KEY).await.unwrap().unwrap()).unwrap();
    document[0]["title"] = json!("Last Light at the Pier");
    document[0]["visible"] = json!(false);
    document[0]["featured"] = json!(true);
    let edited = serde_json::to_string(&document).unwrap();
    gallery.store.set(CATALOG_KEY, &edited).await.unwrap();

    let path = gallery.metadata(json!([record("golden-hour.jpg", 8000, 5000)]));
    let report = gallery
        .sync
        .run_catalog_update(&path, &CaptionIndex::default(), false)
        .await
        .unwrap();

    let backup_key = report.backup_key.expect("previous catalog backed up");
    assert_eq!(gallery.store.get(&backup_key).await.unwrap().unwrap(), edited);

    let live = gallery.live().await;
    assert_eq!(live[0].title, "Last Light at the Pier");
    assert!(!live[0].visible);
    assert_eq!(live[0].extra["featured"], json!(true));
    assert_eq!((live[0].width, live[0].height), (8000, 5000));
}

#[tokio::test]
async fn test_removed_and_unpublished_images() {
    let gallery = Gallery::new(&["a.jpg", "b.jpg"]);
    let path = gallery.metadata(json!([record("a.jpg", 4000, 3000), record("b.jpg", 4000, 3000)]));
    gallery
        .sync
        .run_catalog_update(&path, &CaptionIndex::default(), false)
        .await
        .unwrap();

    // b is gone from the extractor output, c has no derivatives yet.
    let path = gallery.metadata(json!([record("a.jpg", 4000, 3000), record("c.jpg", 4000, 3000)]));
    let report = gallery
        .sync
        .run_catalog_update(&path, &CaptionIndex::default(), false)
        .await
        .unwrap();

    assert_eq!(report.item_count, 1);
    assert!(report.missing_ids.contains("b"));
    assert!(!report.missing_ids.contains("c"));
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, MergeWarning::AssetMissing { id, .. } if id == "c")));
    assert_eq!(report.dropped_count(), 1);
    let ids: Vec<String> = gallery.live().await.into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["a"]);
}

#[tokio::test]
async fn test_captions_fill_only_empty_fields() {
    let gallery = Gallery::new(&["fog.jpg"]);
    let mut captions = CaptionIndex::default();
    captions.insert(
        "fog".to_string(),
        Caption {
            title: "Morning Fog".to_string(),
            description: "Fog rolling over the harbour.".to_string(),
            tags: vec!["fog".to_string(), "harbour".to_string()],
        },
    );
    let path = gallery.metadata(json!([record("fog.jpg", 4000, 3000)]));

    // First seen without captions: the title falls back to the id.
    gallery
        .sync
        .run_catalog_update(&path, &CaptionIndex::default(), false)
        .await
        .unwrap();
    assert_eq!(gallery.live().await[0].title, "Fog");

    gallery.sync.run_catalog_update(&path, &captions, false).await.unwrap();
    let live = gallery.live().await;
    assert_eq!(live[0].title, "Fog");
    assert_eq!(live[0].description, "Fog rolling over the harbour.");
    assert_eq!(live[0].tags, vec!["fog", "harbour"]);
}

#[tokio::test]
async fn test_dry_run_leaves_store_untouched() {
    let gallery = Gallery::new(&["a.jpg"]);
    let path = gallery.metadata(json!([record("a.jpg", 4000, 3000)]));
    let report = gallery
        .sync
        .run_catalog_update(&path, &CaptionIndex::default(), true)
        .await
        .unwrap();
    assert!(report.dry_run);
    assert_eq!(report.item_count, 1);
    assert!(gallery.store.get(CATALOG_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unreadable_metadata_aborts_before_store() {
    let gallery = Gallery::new(&[]);
    let path = gallery.dir.path().join("data").join("image-metadata.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[{\"file\": ").unwrap();

    let err = gallery
        .sync
        .run_catalog_update(&path, &CaptionIndex::default(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, darkroom::error::CatalogError::SourceUnreadable { .. }));
    assert!(gallery.store.get(CATALOG_KEY).await.unwrap().is_none());
}
