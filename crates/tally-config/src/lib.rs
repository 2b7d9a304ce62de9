//! Configuration for the Tally command-line client.
//!
//! A single TOML file holds the server to talk to, request timeouts, the
//! auth route prefix and the log filter:
//!
//! ```toml
//! server = "http://localhost:8080"
//! timeout-secs = 30
//! auth-prefix = "/api/auth/"
//!
//! [logging]
//! filter = "tally=info,tally_client=info,warn"
//! ```

use std::path::PathBuf;

pub mod client;
pub mod error;

pub use client::{
    client_config_path, load_client_config, load_client_config_from, save_client_config,
    save_client_config_to, ClientConfig, LoggingConfig, DEFAULT_SERVER,
};
pub use error::{ConfigError, Result};

/// Application directory name under the platform config dir.
const APP_NAME: &str = "tally";

/// Overrides the config directory (used by tests and containers).
pub const CONFIG_DIR_ENV: &str = "TALLY_CONFIG_DIR";

/// Get the config directory for tally.
///
/// Checks `TALLY_CONFIG_DIR` first, then falls back to the platform default.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Directory for rotated log files.
pub fn log_dir() -> Option<PathBuf> {
    config_dir().map(|d| d.join("logs"))
}
