//! Backup-before-overwrite behaviour of catalog writes and restores.

use darkroom::assets::{AssetCheck, AssetLayout};
use darkroom::captions::CaptionIndex;
use darkroom::catalog::{CatalogSync, ImageMetadata};
use darkroom::error::CatalogError;
use darkroom::pricing::PricingPolicy;
use darkroom::store::{
    KeyValueStore, MemoryKeyValueStore, SnapshotStore, BACKUP_PREFIX, CATALOG_KEY,
};
use serde_json::json;
use std::sync::Arc;

fn sync_over(memory: Arc<MemoryKeyValueStore>) -> CatalogSync {
    let assets: Arc<dyn AssetCheck> = Arc::new(|_: &str| true);
    CatalogSync::new(
        SnapshotStore::new(memory),
        PricingPolicy::default(),
        AssetLayout::default(),
        assets,
    )
}

fn metadata(files: &[&str]) -> Vec<ImageMetadata> {
    files
        .iter()
        .map(|file| {
            serde_json::from_value(json!({"file": file, "width": 4000, "height": 3000})).unwrap()
        })
        .collect()
}

const PREVIOUS: &str = r#"[{"id":"harbour","title":"Harbour","width":1,"height":1}]"#;

#[tokio::test]
async fn test_failed_backup_leaves_live_catalog_untouched() {
    let memory = Arc::new(MemoryKeyValueStore::with_entries([(CATALOG_KEY, PREVIOUS)]));
    memory.fail_writes_matching(BACKUP_PREFIX);
    let sync = sync_over(memory.clone());

    let err = sync
        .update_from_metadata(&metadata(&["harbour.jpg"]), &CaptionIndex::default(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::BackupFailed { .. }));
    assert_eq!(memory.snapshot()[CATALOG_KEY], PREVIOUS);
    assert!(memory.write_log().is_empty());
}

#[tokio::test]
async fn test_backup_is_written_before_catalog() {
    let memory = Arc::new(MemoryKeyValueStore::with_entries([(CATALOG_KEY, PREVIOUS)]));
    let sync = sync_over(memory.clone());

    let report = sync
        .update_from_metadata(&metadata(&["harbour.jpg"]), &CaptionIndex::default(), false)
        .await
        .unwrap();

    let log = memory.write_log();
    assert_eq!(log.len(), 2);
    assert!(log[0].starts_with(BACKUP_PREFIX));
    assert_eq!(log[1], CATALOG_KEY);
    assert_eq!(Some(log[0].clone()), report.backup_key);
    assert_eq!(memory.snapshot()[&log[0]], PREVIOUS);
}

#[tokio::test]
async fn test_rapid_updates_get_distinct_backup_keys() {
    let memory = Arc::new(MemoryKeyValueStore::with_entries([(CATALOG_KEY, PREVIOUS)]));
    let sync = sync_over(memory.clone());
    let items = metadata(&["harbour.jpg"]);

    let mut keys = Vec::new();
    for _ in 0..5 {
        let report = sync
            .update_from_metadata(&items, &CaptionIndex::default(), false)
            .await
            .unwrap();
        keys.push(report.backup_key.unwrap());
    }
    let mut unique = keys.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 5);

    let listed = sync.snapshots().list_backups().await.unwrap();
    assert_eq!(listed.len(), 5);
    assert!(listed[0].timestamp_ms >= listed[4].timestamp_ms);
}

#[tokio::test]
async fn test_missing_items_do_not_block_the_write() {
    let memory = Arc::new(MemoryKeyValueStore::with_entries([(
        CATALOG_KEY,
        r#"[{"id":"a"},{"id":"b"}]"#,
    )]));
    let sync = sync_over(memory.clone());

    let report = sync
        .update_from_metadata(&metadata(&["a.jpg"]), &CaptionIndex::default(), false)
        .await
        .unwrap();

    assert_eq!(report.missing_ids.iter().collect::<Vec<_>>(), vec!["b"]);
    let live: Vec<serde_json::Value> =
        serde_json::from_str(&memory.get(CATALOG_KEY).await.unwrap().unwrap()).unwrap();
    assert_eq!(live.len(), 1);
}

#[tokio::test]
async fn test_restore_round_trip() {
    let memory = Arc::new(MemoryKeyValueStore::new());
    let sync = sync_over(memory.clone());

    sync.update_from_metadata(&metadata(&["a.jpg"]), &CaptionIndex::default(), false)
        .await
        .unwrap();
    let first_live = memory.snapshot()[CATALOG_KEY].clone();
    let report = sync
        .update_from_metadata(&metadata(&["a.jpg", "b.jpg"]), &CaptionIndex::default(), false)
        .await
        .unwrap();
    let backup_key = report.backup_key.unwrap();

    let restore = sync.restore_backup(&backup_key).await.unwrap();
    assert_eq!(restore.item_count, 1);
    assert_eq!(restore.restored_from, backup_key);

    // The two-item catalog that the restore replaced is itself backed up.
    let replaced_key = restore.backup_key.unwrap();
    let replaced: Vec<serde_json::Value> =
        serde_json::from_str(&memory.snapshot()[&replaced_key]).unwrap();
    assert_eq!(replaced.len(), 2);

    let live: Vec<serde_json::Value> = serde_json::from_str(&memory.snapshot()[CATALOG_KEY]).unwrap();
    let first: Vec<serde_json::Value> = serde_json::from_str(&first_live).unwrap();
    assert_eq!(live, first);
}

#[tokio::test]
async fn test_restore_unknown_backup() {
    let memory = Arc::new(MemoryKeyValueStore::with_entries([(CATALOG_KEY, PREVIOUS)]));
    let sync = sync_over(memory.clone());
    let err = sync
        .restore_backup("gallery:backup:42")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::BackupNotFound(_)));
    assert_eq!(memory.snapshot()[CATALOG_KEY], PREVIOUS);
}
