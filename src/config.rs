//! Configuration loading and persistence.
//!
//! Reads `config.json` from the config directory and layers `CHARTER_PUSH_*`
//! environment variables on top. The session token is never written to disk;
//! it comes from `CHARTER_PUSH_TOKEN` only.

use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::agent::NotificationConfigPatch;
use crate::constants::{
    DEFAULT_APP_ORIGIN, DEFAULT_SERVER_URL, HTTP_REQUEST_TIMEOUT, REGISTRATION_CACHE_FILE,
    SUBSCRIPTION_FILE,
};
use crate::registration::TokenProvider;

/// Configuration for push provisioning.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the API server hosting the device registry.
    pub server_url: String,
    /// Origin the notification agent is scoped to; relative deep links
    /// resolve against it.
    pub app_origin: String,
    /// Base64url VAPID public key subscriptions are bound to.
    pub application_server_key: String,
    /// Bound on each registry call, in seconds.
    pub request_timeout_secs: u64,
    /// Branding overrides sent to the notification agent.
    pub notification: NotificationConfigPatch,
    /// Session token - NOT serialized to disk.
    #[serde(skip)]
    pub token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            app_origin: DEFAULT_APP_ORIGIN.to_string(),
            application_server_key: String::new(),
            request_timeout_secs: HTTP_REQUEST_TIMEOUT.as_secs(),
            notification: NotificationConfigPatch::default(),
            token: String::new(),
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// Directory selection priority:
    /// 1. `#[cfg(test)]` (unit tests): `tmp/charter-push-test`
    /// 2. `CHARTER_PUSH_CONFIG_DIR` env var
    /// 3. Platform config dir (Linux: ~/.config/charter-push)
    pub fn config_dir() -> Result<PathBuf> {
        let dir = {
            #[cfg(test)]
            {
                PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tmp/charter-push-test")
            }

            #[cfg(not(test))]
            {
                if let Ok(dir) = std::env::var("CHARTER_PUSH_CONFIG_DIR") {
                    PathBuf::from(dir)
                } else {
                    dirs::config_dir()
                        .context("Could not determine config directory")?
                        .join("charter-push")
                }
            }
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::load_from_file() {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("Ignoring unreadable config file: {e:#}");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_file() -> Result<Option<Self>> {
        let config_path = Self::config_dir()?.join("config.json");
        if !config_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&config_path)?;
        Ok(Some(
            serde_json::from_str(&content).context("Invalid config.json")?,
        ))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(server_url) = std::env::var("CHARTER_PUSH_SERVER_URL") {
            self.server_url = server_url;
        }

        if let Ok(token) = std::env::var("CHARTER_PUSH_TOKEN") {
            self.token = token;
        }

        if let Ok(origin) = std::env::var("CHARTER_PUSH_APP_ORIGIN") {
            self.app_origin = origin;
        }

        if let Ok(key) = std::env::var("CHARTER_PUSH_VAPID_PUBLIC_KEY") {
            self.application_server_key = key;
        }

        if let Ok(timeout) = std::env::var("CHARTER_PUSH_REQUEST_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.request_timeout_secs = secs;
            }
        }
    }

    /// Persists the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_dir()?.join("config.json");
        fs::write(&config_path, serde_json::to_string_pretty(self)?)?;

        #[cfg(unix)]
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// Check if a session token is present.
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Registry call timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Path of the registration cache file.
    pub fn registration_cache_path(&self) -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(REGISTRATION_CACHE_FILE))
    }

    /// Path where the local platform keeps its subscription.
    pub fn subscription_path(&self) -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(SUBSCRIPTION_FILE))
    }
}

impl TokenProvider for Config {
    fn token(&self) -> Option<String> {
        self.has_token().then(|| self.token.clone())
    }
}
