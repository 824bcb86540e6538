//! Settings for proxy images, runtime discovery and poll deadlines.
//!
//! The library never reads settings on its own. Callers either use
//! [`ExposeSettings::default`] or load a JSON file through [`SettingsStore`],
//! typically `<config_dir>/vcexpose/settings.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Image that relays TCP bytes from `BACKEND_HOST:BACKEND_PORT`.
pub const DEFAULT_PROXY_IMAGE: &str = "ghcr.io/loft-sh/docker-tcp-proxy";

/// Image used to run `kubectl port-forward` for background proxies.
pub const DEFAULT_BACKGROUND_PROXY_IMAGE: &str = "bitnami/kubectl:1.29";

/// Upper bound for every interval and deadline setting.
pub const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

/// Tunables for exposure and teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposeSettings {
    /// Forwarding image started by the proxy manager.
    #[serde(default = "default_proxy_image")]
    pub proxy_image: String,

    /// Image started for background proxies.
    #[serde(default = "default_background_proxy_image")]
    pub background_proxy_image: String,

    /// Explicit path to the container runtime CLI. Discovered when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_binary: Option<PathBuf>,

    /// Sleep between two verification attempts.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Deadline for a single namespace GET.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Deadline when re-verifying an existing proxy.
    #[serde(default = "default_reuse_timeout")]
    pub reuse_timeout_secs: u64,

    /// Deadline for direct host-port and direct-IP strategies.
    #[serde(default = "default_direct_timeout")]
    pub direct_timeout_secs: u64,

    /// Deadline after starting a new proxy container.
    #[serde(default = "default_proxy_start_timeout")]
    pub proxy_start_timeout_secs: u64,

    /// Deadline after starting a background proxy.
    #[serde(default = "default_background_proxy_timeout")]
    pub background_proxy_timeout_secs: u64,
}

fn default_proxy_image() -> String {
    DEFAULT_PROXY_IMAGE.to_string()
}

fn default_background_proxy_image() -> String {
    DEFAULT_BACKGROUND_PROXY_IMAGE.to_string()
}

fn default_poll_interval() -> u64 {
    1
}

fn default_request_timeout() -> u64 {
    3
}

fn default_reuse_timeout() -> u64 {
    5
}

fn default_direct_timeout() -> u64 {
    20
}

fn default_proxy_start_timeout() -> u64 {
    30
}

fn default_background_proxy_timeout() -> u64 {
    60
}

impl Default for ExposeSettings {
    fn default() -> Self {
        Self {
            proxy_image: default_proxy_image(),
            background_proxy_image: default_background_proxy_image(),
            runtime_binary: None,
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
            reuse_timeout_secs: default_reuse_timeout(),
            direct_timeout_secs: default_direct_timeout(),
            proxy_start_timeout_secs: default_proxy_start_timeout(),
            background_proxy_timeout_secs: default_background_proxy_timeout(),
        }
    }
}

impl ExposeSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reuse_timeout(&self) -> Duration {
        Duration::from_secs(self.reuse_timeout_secs)
    }

    pub fn direct_timeout(&self) -> Duration {
        Duration::from_secs(self.direct_timeout_secs)
    }

    pub fn proxy_start_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_start_timeout_secs)
    }

    pub fn background_proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.background_proxy_timeout_secs)
    }

    /// Rejects settings that would make every poll loop spin or never finish.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(Error::Config("pollIntervalSecs must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("requestTimeoutSecs must be at least 1".to_string()));
        }
        for (field, secs) in [
            ("pollIntervalSecs", self.poll_interval_secs),
            ("requestTimeoutSecs", self.request_timeout_secs),
            ("reuseTimeoutSecs", self.reuse_timeout_secs),
            ("directTimeoutSecs", self.direct_timeout_secs),
            ("proxyStartTimeoutSecs", self.proxy_start_timeout_secs),
            ("backgroundProxyTimeoutSecs", self.background_proxy_timeout_secs),
        ] {
            if secs > MAX_DURATION_SECS {
                return Err(Error::Config(format!(
                    "{} must be at most {} (one day)",
                    field, MAX_DURATION_SECS
                )));
            }
        }
        if self.proxy_image.trim().is_empty() {
            return Err(Error::Config("proxyImage must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Reads and writes [`ExposeSettings`] as JSON.
pub struct SettingsStore {
    settings_path: PathBuf,
}

impl SettingsStore {
    /// Creates a store at the default path (`<config_dir>/vcexpose/settings.json`).
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        Ok(Self {
            settings_path: config_dir.join("vcexpose").join("settings.json"),
        })
    }

    /// Creates a store with a custom path.
    pub fn with_path(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    /// Loads settings from disk.
    ///
    /// Returns the defaults if the file doesn't exist.
    pub async fn load(&self) -> Result<ExposeSettings> {
        if !self.settings_path.exists() {
            return Ok(ExposeSettings::default());
        }

        let content = fs::read_to_string(&self.settings_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read settings: {}", e)))?;

        let settings: ExposeSettings = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))?;
        settings.validate()?;

        Ok(settings)
    }

    /// Saves settings to disk, creating the parent directory if needed.
    pub async fn save(&self, settings: &ExposeSettings) -> Result<()> {
        settings.validate()?;

        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Config(format!("Failed to create settings directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.settings_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp settings file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write settings: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync settings: {}", e)))?;

        fs::rename(&temp_path, &self.settings_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename settings file: {}", e)))?;

        Ok(())
    }
}
