//! Shared test utilities for integration tests
//!
//! Builds throwaway gallery workspaces and serializes access to the process
//! environment, which config loading reads.

use darkroom::assets::AssetLayout;
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const ISOLATED_VARS: [&str; 3] = ["XDG_CONFIG_HOME", "DARKROOM_ENV", "DARKROOM__PRICING__DPI"];

/// Run `f` with `XDG_CONFIG_HOME` pointing into `test_dir` and darkroom
/// environment overrides cleared. The original environment is restored after.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let saved: Vec<_> = ISOLATED_VARS
        .iter()
        .map(|name| (*name, std::env::var_os(name)))
        .collect();

    let config_home = test_dir.path().join("xdg");
    std::fs::create_dir_all(&config_home).unwrap();
    for name in ISOLATED_VARS {
        std::env::remove_var(name);
    }
    std::env::set_var("XDG_CONFIG_HOME", &config_home);

    let result = f();

    for (name, value) in saved {
        match value {
            Some(v) => std::env::set_var(name, v),
            None => std::env::remove_var(name),
        }
    }
    result
}

/// Write both derivatives of each file under `<root>/public`.
pub fn publish_assets(root: &Path, files: &[&str]) {
    let layout = AssetLayout::default();
    for file in files {
        for public in [layout.medium_path(file), layout.thumbnail_path(file)] {
            let path = root.join("public").join(public.trim_start_matches('/'));
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"jpeg").unwrap();
        }
    }
}

pub fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// Extractor record with a single L print size.
pub fn record(file: &str, width: i64, height: i64) -> Value {
    serde_json::json!({
        "file": file,
        "width": width,
        "height": height,
        "printSizes": {"L": {"long": 60.0, "short": 40.0}},
        "resolutionWarnings": {"L": false}
    })
}
