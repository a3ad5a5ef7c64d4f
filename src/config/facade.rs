//! Entry points for loading configuration.

use super::merge::merge_policy::builder_with_defaults;
use super::sources::{environment, global_file, workspace_file};
use super::DarkroomConfig;
use crate::error::ApiError;
use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (highest last): defaults, global file, `config/config.toml`,
    /// `config/{DARKROOM_ENV}.toml`, `DARKROOM__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<DarkroomConfig, ApiError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config = Self::finish(builder)?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from one explicit file, skipping global and workspace files.
    pub fn load_from_file(path: &Path) -> Result<DarkroomConfig, ApiError> {
        if !path.is_file() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = builder_with_defaults()?.add_source(File::from(path).required(true));
        Self::finish(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<DarkroomConfig, ApiError> {
        let builder = environment::add_to_builder(builder)?;
        let mut config: DarkroomConfig = builder.build()?.try_deserialize()?;
        config.pricing.canonicalize_format_codes();

        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ApiError::ConfigError(format!("Invalid configuration: {}", messages.join("; ")))
        })?;
        Ok(config)
    }
}
