//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with merge policy defaults applied.
///
/// Sources added later override earlier ones key by key; tables merge, while
/// arrays and scalars are replaced whole.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("gallery.metadata_path", "data/image-metadata.json")?
        .set_default("gallery.captions_path", "data/captions.json")?
        .set_default("gallery.asset_root", "public")?
        .set_default("store.backend", "sled")?
        .set_default("store.environment", "development")
}
