//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, CatalogError};

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Catalog(CatalogError::BackupFailed { .. }) => {
            format!("{}\nThe live catalog was not modified.", e)
        }
        ApiError::ProviderNotConfigured(_) => {
            format!("{}\nAdd a [provider] section to config/config.toml.", e)
        }
        _ => e.to_string(),
    }
}

/// Process exit code for an error.
pub fn exit_code(e: &ApiError) -> i32 {
    match e {
        ApiError::InvalidInput(_) | ApiError::ConfigError(_) => 2,
        _ => 1,
    }
}
