//! Layered configuration as seen by the CLI run context.

use super::test_utils::with_isolated_env;
use darkroom::cli::RunContext;
use darkroom::store::{StoreBackend, StoreEnvironment};
use std::fs;
use tempfile::TempDir;

fn write(path: &std::path::Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

#[test]
fn test_workspace_config_reaches_run_context() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("config").join("config.toml"),
        r#"
[gallery]
public_base_url = "https://photos.example.com"
asset_root = "site/public"

[store]
backend = "memory"

[pricing]
dpi = 300.0
"#,
    );

    let ctx = with_isolated_env(&test_dir, || {
        RunContext::new(workspace.path().to_path_buf(), None).unwrap()
    });
    let config = ctx.config();
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.pricing.dpi, 300.0);
    assert_eq!(
        config.gallery.asset_root(ctx.workspace_root()),
        workspace.path().join("site/public")
    );
    assert_eq!(
        config.gallery.public_url("pier.jpg").as_deref(),
        Some("https://photos.example.com/images/gallery/medium/pier.jpg")
    );
}

#[test]
fn test_global_file_env_file_and_variables_layer_in_order() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &test_dir.path().join("xdg").join("darkroom").join("config.toml"),
        "[pricing]\ndpi = 200.0\nvat_rate = 0.07\n",
    );
    write(
        &workspace.path().join("config").join("config.toml"),
        "[pricing]\ndpi = 240.0\n",
    );
    write(
        &workspace.path().join("config").join("staging.toml"),
        "[pricing]\nmin_margin = 90.0\n",
    );

    let config = with_isolated_env(&test_dir, || {
        std::env::set_var("DARKROOM_ENV", "staging");
        std::env::set_var("DARKROOM__PRICING__DPI", "260");
        RunContext::new(workspace.path().to_path_buf(), None)
            .unwrap()
            .config()
            .clone()
    });
    assert_eq!(config.pricing.vat_rate, 0.07);
    assert_eq!(config.pricing.min_margin, 90.0);
    assert_eq!(config.pricing.dpi, 260.0);
}

#[test]
fn test_explicit_config_file_skips_workspace_files() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("config").join("config.toml"),
        "[pricing]\ndpi = 240.0\n",
    );
    let explicit = test_dir.path().join("darkroom.toml");
    write(&explicit, "[pricing]\ndpi = 180.0\n");

    let ctx = with_isolated_env(&test_dir, || {
        RunContext::new(workspace.path().to_path_buf(), Some(explicit.clone())).unwrap()
    });
    assert_eq!(ctx.config().pricing.dpi, 180.0);
}

#[test]
fn test_production_store_needs_production_credentials() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("config").join("config.toml"),
        r#"
[store]
backend = "rest"

[store.development]
url = "https://dev.kv.example"
token = "dev-token"
"#,
    );

    let ctx = with_isolated_env(&test_dir, || {
        RunContext::new(workspace.path().to_path_buf(), None).unwrap()
    });
    assert_eq!(ctx.config().store.environment, StoreEnvironment::Development);
    assert!(ctx.with_store_environment(StoreEnvironment::Production).is_err());
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("config").join("config.toml"),
        "[gallery]\ncaption_concurrency = 0\n",
    );

    let result = with_isolated_env(&test_dir, || {
        RunContext::new(workspace.path().to_path_buf(), None)
    });
    assert!(result.is_err());
}
