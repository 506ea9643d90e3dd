//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, the inactivity budget, the token storage
//! backend and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/adaide/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "adaide";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when neither the config file nor the environment names one.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Environment override for the API base URL
const API_URL_ENV: &str = "ADAIDE_API_URL";

/// Minutes of silence before a signed-in user is logged out.
pub const DEFAULT_INACTIVITY_MINUTES: u64 = 90;

/// Where the bearer token is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    /// JSON session file in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub inactivity_minutes: Option<u64>,
    #[serde(default)]
    pub token_storage: TokenStorage,
    pub last_email: Option<String>,
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

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join("logs"))
    }

    /// Base URL for the backend. The environment wins over the config file.
    pub fn api_url(&self) -> String {
        let url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        url.trim_end_matches('/').to_string()
    }

    /// Maximum allowed silence before forced logout.
    pub fn inactivity_budget(&self) -> Duration {
        let minutes = match self.inactivity_minutes {
            Some(m) if m > 0 => m,
            _ => DEFAULT_INACTIVITY_MINUTES,
        };
        Duration::from_secs(minutes * 60)
    }
}
