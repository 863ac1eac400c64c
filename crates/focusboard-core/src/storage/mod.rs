mod config;
pub mod database;
pub mod migrations;
pub mod sync_state;

pub use config::{Config, GoogleConfig, SyncConfig};
pub use database::Database;
pub use sync_state::{SyncState, SyncStateStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/focusboard[-dev]/` based on FOCUSBOARD_ENV.
///
/// Set FOCUSBOARD_ENV=dev to use the development data directory, or
/// FOCUSBOARD_HOME to point at an explicit directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("FOCUSBOARD_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("FOCUSBOARD_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusboard-dev")
            } else {
                base_dir.join("focusboard")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::NoDataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
