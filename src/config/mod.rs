//! Configuration management

use crate::presence::SessionOptions;
use crate::rpc::DisplayAssets;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the configured client id
pub const CLIENT_ID_ENV: &str = "DISCORD_CLIENT_ID";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub presence: PresenceConfig,
    pub display: DisplayConfig,
}

/// Connection and timer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Application (client) id registered with the status service
    pub client_id: Option<String>,

    /// Seconds between presence re-sends while connected
    pub heartbeat_seconds: u64,

    /// Seconds between connection retries while disconnected
    pub reconnect_seconds: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            heartbeat_seconds: 15,
            reconnect_seconds: 30,
        }
    }
}

/// Art shown next to the displayed status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Asset key uploaded with the application
    pub image_key: String,

    /// Hover text for the asset
    pub image_text: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            image_key: "beacon".to_string(),
            image_text: "beacon".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default path, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a specific file, or return defaults if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("beacon")
            .join("config.toml")
    }

    /// Client id, environment taking precedence over the file
    pub fn client_id(&self) -> Option<String> {
        match std::env::var(CLIENT_ID_ENV) {
            Ok(id) if !id.is_empty() => Some(id),
            _ => self
                .presence
                .client_id
                .clone()
                .filter(|id| !id.is_empty()),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            heartbeat_interval: Duration::from_secs(self.presence.heartbeat_seconds),
            reconnect_interval: Duration::from_secs(self.presence.reconnect_seconds),
        }
    }

    pub fn display_assets(&self) -> DisplayAssets {
        DisplayAssets {
            image_key: self.display.image_key.clone(),
            image_text: self.display.image_text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/beacon.toml")).unwrap();
        assert_eq!(config.presence.heartbeat_seconds, 15);
        assert_eq!(config.presence.reconnect_seconds, 30);
        assert!(config.presence.client_id.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[presence]\nclient_id = \"12345\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.presence.client_id.as_deref(), Some("12345"));
        assert_eq!(config.presence.heartbeat_seconds, 15);
        assert_eq!(config.display.image_key, "beacon");
    }

    #[test]
    fn empty_client_id_counts_as_absent() {
        let config = Config {
            presence: PresenceConfig {
                client_id: Some(String::new()),
                ..Default::default()
            },
            ..Default::default()
        };
        // Only meaningful when the env override is not set
        if std::env::var(CLIENT_ID_ENV).is_err() {
            assert!(config.client_id().is_none());
        }
    }
}
