//! Configuration file handling for the x431 CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use x431_client::{ClientConfig, Credentials};

/// Contents of `config.toml`
///
/// ```toml
/// username = "1234567"
/// password = "secret"
/// serial = "986690000123"
///
/// [client]
/// connect_timeout_ms = 10000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Account name or number
    pub username: Option<String>,
    /// Account password
    pub password: Option<String>,
    /// Default device serial number
    pub serial: Option<String>,
    /// Endpoint and timeout overrides
    #[serde(default)]
    pub client: Option<ClientConfig>,
}

impl Config {
    /// Load the default config file, falling back to defaults with a warning
    /// when it is missing or unreadable
    pub fn load_or_default() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_or_default_from(&path),
            Err(e) => {
                warn!("Ignoring default config file: {:#}", e);
                Self::default()
            }
        }
    }

    fn load_or_default_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(path).unwrap_or_else(|e| {
            warn!("Ignoring default config file: {:#}", e);
            Self::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("x431");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &ArgOverrides<'_>) -> MergedConfig {
        let mut client = self.client.clone().unwrap_or_default();
        if let Some(url) = args.api_url {
            client.api_url = url.to_string();
        }
        if let Some(url) = args.socket_url {
            client.socket_url = url.to_string();
        }
        if let Some(ms) = args.connect_timeout_ms {
            client.connect_timeout_ms = ms;
        }

        MergedConfig {
            username: args
                .username
                .map(String::from)
                .or_else(|| self.username.clone()),
            password: args
                .password
                .map(String::from)
                .or_else(|| self.password.clone()),
            serial: args.serial.map(String::from).or_else(|| self.serial.clone()),
            client,
        }
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Default)]
pub struct ArgOverrides<'a> {
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub serial: Option<&'a str>,
    pub api_url: Option<&'a str>,
    pub socket_url: Option<&'a str>,
    pub connect_timeout_ms: Option<u64>,
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub serial: Option<String>,
    pub client: ClientConfig,
}

impl MergedConfig {
    /// Credentials, or an error naming the missing setting
    pub fn credentials(&self) -> Result<Credentials> {
        let username = self
            .username
            .clone()
            .context("No username configured (use --username, X431_USERNAME or config.toml)")?;
        let password = self
            .password
            .clone()
            .context("No password configured (use --password, X431_PASSWORD or config.toml)")?;
        Ok(Credentials::new(username, password))
    }
}
