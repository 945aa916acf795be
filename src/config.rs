//! Client configuration and service constants.
//!
//! `Config` covers the pieces a caller may want to override: the API
//! host (useful for tests), the credential storage directory, and a
//! stable device UUID. It persists as JSON under the platform config
//! directory at `~/.config/yay-client/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Production API host.
pub const API_HOST: &str = "https://api.yay.space";

/// Static application key sent with unauthenticated requests.
/// Ships with every client build; this is not a secret.
pub const API_KEY: &str = "ccd59ee269c01511ba763467045c115779fcae3050238a252f1bd1a4b65cfec6";

/// Shared key mixed into signed request digests for endpoints that
/// require a stronger signature.
pub const SHARED_KEY: &str = "yayZ1";

/// Application name used for config/storage directory paths
const APP_NAME: &str = "yay-client";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Subdirectory of the data dir holding encrypted credential records
const CREDENTIAL_DIR: &str = "credentials";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API host, including scheme. Defaults to the production host.
    pub api_host: String,
    /// Override for the credential storage directory.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    /// Stable device identifier. Generated and saved on first run when
    /// absent, so the service sees one device across restarts.
    #[serde(default)]
    pub device_uuid: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: API_HOST.to_string(),
            storage_dir: None,
            device_uuid: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the encrypted credential store.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.storage_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(CREDENTIAL_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_points_at_production() {
        let config = Config::default();
        assert_eq!(config.api_host, API_HOST);
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn test_storage_dir_override_wins() {
        let config = Config {
            storage_dir: Some(PathBuf::from("/tmp/yay-test-store")),
            ..Config::default()
        };
        assert_eq!(
            config.storage_dir().unwrap(),
            PathBuf::from("/tmp/yay-test-store")
        );
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = Config {
            api_host: "http://localhost:1234".to_string(),
            storage_dir: Some(PathBuf::from("/tmp/store")),
            device_uuid: Some("dev-1".to_string()),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.api_host, config.api_host);
        assert_eq!(back.storage_dir, config.storage_dir);
        assert_eq!(back.device_uuid, config.device_uuid);
    }
}
