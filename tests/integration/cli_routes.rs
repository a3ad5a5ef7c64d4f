//! Command routing over a shared sled store.

use super::test_utils::{publish_assets, record, write_json};
use darkroom::cli::{BackupCommands, CatalogCommands, Commands, RunContext};
use darkroom::config::DarkroomConfig;
use darkroom::store::{KeyValueStore, SledKeyValueStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn update(format: &str) -> Commands {
    Commands::Update {
        metadata: None,
        captions: None,
        dry_run: false,
        format: format.to_string(),
    }
}

#[test]
fn test_update_backup_and_restore_through_routes() {
    let workspace = TempDir::new().unwrap();
    publish_assets(workspace.path(), &["pier.jpg", "dunes.jpg"]);
    let metadata = workspace.path().join("data").join("image-metadata.json");
    write_json(&metadata, &json!([record("pier.jpg", 6000, 4000)]));

    let ctx = RunContext::from_config(workspace.path().to_path_buf(), DarkroomConfig::default());
    let store: Arc<dyn KeyValueStore> =
        Arc::new(SledKeyValueStore::new(workspace.path().join(".darkroom/store")).unwrap());

    let text = ctx.execute_with_store(&update("text"), Arc::clone(&store)).unwrap();
    assert!(text.contains("Items: 1 (previously 0)"));

    write_json(
        &metadata,
        &json!([record("pier.jpg", 6000, 4000), record("dunes.jpg", 5000, 5000)]),
    );
    let report: Value =
        serde_json::from_str(&ctx.execute_with_store(&update("json"), Arc::clone(&store)).unwrap())
            .unwrap();
    assert_eq!(report["item_count"], 2);
    let backup_key = report["backup_key"].as_str().unwrap().to_string();

    let listed: Value = serde_json::from_str(
        &ctx.execute_with_store(
            &Commands::Backups {
                command: BackupCommands::List {
                    format: "json".to_string(),
                },
            },
            Arc::clone(&store),
        )
        .unwrap(),
    )
    .unwrap();
    assert_eq!(listed[0]["key"], backup_key);

    let restored = ctx
        .execute_with_store(
            &Commands::Backups {
                command: BackupCommands::Restore {
                    key: backup_key,
                    yes: true,
                },
            },
            Arc::clone(&store),
        )
        .unwrap();
    assert!(restored.contains("Restored 1 item(s)"));

    let catalog: Value = serde_json::from_str(
        &ctx.execute_with_store(
            &Commands::Catalog {
                command: CatalogCommands::Show {
                    format: "json".to_string(),
                },
            },
            store,
        )
        .unwrap(),
    )
    .unwrap();
    assert_eq!(catalog.as_array().unwrap().len(), 1);
    assert_eq!(catalog[0]["id"], "pier");
}

#[test]
fn test_audit_reports_orphans() {
    let workspace = TempDir::new().unwrap();
    publish_assets(workspace.path(), &["pier.jpg", "unused.jpg"]);
    write_json(
        &workspace.path().join("data").join("image-metadata.json"),
        &json!([record("pier.jpg", 6000, 4000)]),
    );
    let ctx = RunContext::from_config(workspace.path().to_path_buf(), DarkroomConfig::default());
    let store: Arc<dyn KeyValueStore> =
        Arc::new(SledKeyValueStore::new(workspace.path().join(".darkroom/store")).unwrap());
    ctx.execute_with_store(&update("text"), Arc::clone(&store)).unwrap();

    let audit: Value = serde_json::from_str(
        &ctx.execute_with_store(
            &Commands::Catalog {
                command: CatalogCommands::Audit {
                    format: "json".to_string(),
                },
            },
            store,
        )
        .unwrap(),
    )
    .unwrap();
    assert_eq!(audit["missing"].as_array().unwrap().len(), 0);
    assert_eq!(audit["orphans"][0], "/images/gallery/medium/unused.jpg");
}

#[test]
fn test_missing_asset_root_is_a_config_error() {
    let workspace = TempDir::new().unwrap();
    let ctx = RunContext::from_config(workspace.path().to_path_buf(), DarkroomConfig::default());
    let store: Arc<dyn KeyValueStore> = Arc::new(darkroom::store::MemoryKeyValueStore::new());
    let err = ctx.execute_with_store(&update("text"), store).unwrap_err();
    assert!(matches!(err, darkroom::error::ApiError::ConfigError(_)));
}
