//! Client configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Client Config
// ─────────────────────────────────────────────────────────────────────────────

/// Server used when nothing else is configured.
pub const DEFAULT_SERVER: &str = "http://localhost:8080";

/// Default config filename.
const CLIENT_CONFIG_FILE: &str = "config.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_AUTH_PREFIX: &str = "/api/auth/";
const DEFAULT_LOG_FILTER: &str = "tally=info,tally_client=info,warn";

/// Root client configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientConfig {
    /// Base URL of the Tally backend.
    pub server: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Path prefix of the auth endpoints. Requests under it are never
    /// refreshed.
    pub auth_prefix: String,

    /// User-Agent override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auth_prefix: DEFAULT_AUTH_PREFIX.to_string(),
            user_agent: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "server".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout-secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.auth_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid {
                field: "auth-prefix".to_string(),
                reason: "must name a path segment".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logging settings for the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub filter: String,

    /// Write a daily JSON log file under the config directory.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            file: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading / Saving
// ─────────────────────────────────────────────────────────────────────────────

/// Get the path to the client config file.
pub fn client_config_path() -> Option<PathBuf> {
    crate::config_dir().map(|d| d.join(CLIENT_CONFIG_FILE))
}

/// Load the client configuration.
///
/// Returns a default config if the file doesn't exist.
pub fn load_client_config() -> Result<ClientConfig> {
    load_client_config_from(client_config_path().as_deref())
}

/// Load client config from a specific path.
pub fn load_client_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let Some(path) = path else {
        return Ok(ClientConfig::new());
    };

    if !path.exists() {
        return Ok(ClientConfig::new());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;

    ClientConfig::from_toml(&contents)
}

/// Save the client configuration.
pub fn save_client_config(config: &ClientConfig) -> Result<()> {
    let path = client_config_path()
        .ok_or_else(|| ConfigError::Other("Could not determine config directory".to_string()))?;
    save_client_config_to(config, &path)
}

/// Save client config to a specific path.
pub fn save_client_config_to(config: &ClientConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
