//! Configuration System
//!
//! Layered configuration: built-in defaults, the user's global file, the
//! workspace files and finally `DARKROOM__SECTION__KEY` environment variables.
//! Every section has serde defaults, so an empty workspace runs as is.

use crate::assets::AssetLayout;
use crate::chat::ChatConfig;
use crate::logging::LoggingConfig;
use crate::pricing::PricingPolicy;
use crate::provider::ProviderConfig;
use crate::store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::{environment_name, ENV_CONFIG_ENVIRONMENT};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DarkroomConfig {
    #[serde(default)]
    pub gallery: GalleryConfig,

    #[serde(default)]
    pub pricing: PricingPolicy,

    #[serde(default)]
    pub store: StoreConfig,

    /// Chat-completion provider; only the assistant and caption generation need it
    #[serde(default)]
    pub provider: Option<ProviderConfig>,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the gallery's inputs and assets live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Extractor output, one record per image
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,

    #[serde(default = "default_captions_path")]
    pub captions_path: PathBuf,

    /// Directory that public asset paths are relative to
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,

    #[serde(default)]
    pub layout: AssetLayout,

    /// Site origin, e.g. `https://example.com`; needed to caption images
    #[serde(default)]
    pub public_base_url: Option<String>,

    #[serde(default = "default_caption_concurrency")]
    pub caption_concurrency: usize,
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("data/image-metadata.json")
}

fn default_captions_path() -> PathBuf {
    PathBuf::from("data/captions.json")
}

fn default_asset_root() -> PathBuf {
    PathBuf::from("public")
}

fn default_caption_concurrency() -> usize {
    4
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            metadata_path: default_metadata_path(),
            captions_path: default_captions_path(),
            asset_root: default_asset_root(),
            layout: AssetLayout::default(),
            public_base_url: None,
            caption_concurrency: default_caption_concurrency(),
        }
    }
}

impl GalleryConfig {
    pub fn metadata_path(&self, workspace_root: &Path) -> PathBuf {
        anchor(workspace_root, &self.metadata_path)
    }

    pub fn captions_path(&self, workspace_root: &Path) -> PathBuf {
        anchor(workspace_root, &self.captions_path)
    }

    pub fn asset_root(&self, workspace_root: &Path) -> PathBuf {
        anchor(workspace_root, &self.asset_root)
    }

    /// Absolute URL of an image's medium derivative.
    pub fn public_url(&self, file: &str) -> Option<String> {
        let base = self.public_base_url.as_deref()?;
        Some(format!(
            "{}{}",
            base.trim_end_matches('/'),
            self.layout.medium_path(file)
        ))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.metadata_path.as_os_str().is_empty() {
            return Err("metadata_path cannot be empty".to_string());
        }
        if self.caption_concurrency == 0 {
            return Err("caption_concurrency must be at least 1".to_string());
        }
        for prefix in [&self.layout.medium_prefix, &self.layout.thumbnail_prefix] {
            if !prefix.starts_with('/') {
                return Err(format!("Asset prefix '{}' must start with '/'", prefix));
            }
        }
        if let Some(url) = &self.public_base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("public_base_url '{}' must be http(s)", url));
            }
        }
        Ok(())
    }
}

fn anchor(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Gallery(String),
    Pricing(String),
    Store(String),
    Provider(String),
    Chat(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Gallery(msg) => write!(f, "gallery: {}", msg),
            ValidationError::Pricing(msg) => write!(f, "pricing: {}", msg),
            ValidationError::Store(msg) => write!(f, "store: {}", msg),
            ValidationError::Provider(msg) => write!(f, "provider: {}", msg),
            ValidationError::Chat(msg) => write!(f, "chat: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DarkroomConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.gallery.validate() {
            errors.push(ValidationError::Gallery(e));
        }
        if let Err(e) = self.pricing.validate() {
            errors.push(ValidationError::Pricing(e));
        }
        if let Err(e) = self.store.validate() {
            errors.push(ValidationError::Store(e));
        }
        if let Some(Err(e)) = self.provider.as_ref().map(ProviderConfig::validate) {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.chat.validate() {
            errors.push(ValidationError::Chat(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
