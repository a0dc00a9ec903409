//! Application settings management
//!
//! Stores non-sensitive configuration in a plain JSON file. Missing files and
//! missing fields fall back to defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{ClaimError, Result};
use crate::provider::MAINNET_NETWORK_ID;

pub const DEFAULT_SETTLEMENT_URL: &str = "https://scavenger.prod.gd.midnighttge.io";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// Base URL of the remote settlement service
    pub settlement_url: String,
    /// Base URL of the backend proxy, as seen by clients
    pub proxy_url: String,
    /// Port the proxy listens on
    pub listen_port: u16,
    /// Timeout for every outbound HTTP request
    pub request_timeout_secs: u64,
    /// Network id wallets must report
    pub expected_network_id: u8,
    /// End of the claim window, for the countdown
    pub claim_deadline: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            settlement_url: DEFAULT_SETTLEMENT_URL.to_string(),
            proxy_url: "http://localhost:3000".to_string(),
            listen_port: 3000,
            request_timeout_secs: 30,
            expected_network_id: MAINNET_NETWORK_ID,
            claim_deadline: None,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check values that would otherwise fail at first use
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("settlementUrl", &self.settlement_url),
            ("proxyUrl", &self.proxy_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ClaimError::Settings(format!(
                    "{} must be an http(s) URL, got {:?}",
                    name, url
                )));
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(ClaimError::Settings(
                "requestTimeoutSecs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Load settings from `path`, using defaults if the file does not exist
    pub fn open(path: &Path) -> Result<Self> {
        let settings = Self::load_from_file(path)?;
        Ok(Self {
            settings_file: path.to_path_buf(),
            settings,
        })
    }

    fn load_from_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub async fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.settings)?;

        // Write atomically using temp file
        let temp_path = self.settings_file.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.settings_file).await?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Validate, replace and save
    pub async fn update(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        self.save().await
    }

    /// Reset settings to defaults and delete settings file
    pub async fn reset(&mut self) -> Result<()> {
        self.settings = Settings::default();

        if self.settings_file.exists() {
            tokio::fs::remove_file(&self.settings_file).await?;
        }

        Ok(())
    }
}
