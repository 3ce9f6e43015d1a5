mod config;
pub mod database;
pub mod migrations;

pub use config::{BlockingConfig, Config, EnforcementConfig, ExtensionConfig, ServerConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns `~/.config/mindfulblock[-dev]/` based on MINDFULBLOCK_ENV.
///
/// Set MINDFULBLOCK_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MINDFULBLOCK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("mindfulblock-dev")
    } else {
        base_dir.join("mindfulblock")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::NoDataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
