//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API and CDN endpoints, the confirmation poll interval,
//! the bootstrap article count, and the last used email address.
//!
//! Configuration is stored at `~/.config/repyblik/config.json`. Tokens live
//! next to it in `~/.config/repyblik/tokens/`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::cdn::DEFAULT_CDN_URL;
use crate::api::client::DEFAULT_API_URL;

/// Application name used for config directory paths
const APP_NAME: &str = "repyblik";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Directory holding one token file per email address
const TOKEN_DIR: &str = "tokens";

/// Seconds between identity probes while waiting for a sign-in confirmation
const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Articles fetched when a download directory has no checkpoint yet
const DEFAULT_FALLBACK_COUNT: u32 = 10;

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_cdn_url() -> String {
    DEFAULT_CDN_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_fallback_count() -> u32 {
    DEFAULT_FALLBACK_COUNT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_cdn_url")]
    pub cdn_url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_fallback_count")]
    pub fallback_count: u32,
    #[serde(default)]
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            cdn_url: default_cdn_url(),
            poll_interval_secs: default_poll_interval_secs(),
            fallback_count: default_fallback_count(),
            last_email: None,
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

    fn app_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join(CONFIG_FILE))
    }

    /// Directory with one token file per email address
    pub fn token_dir(&self) -> Result<PathBuf> {
        Ok(Self::app_dir()?.join(TOKEN_DIR))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
