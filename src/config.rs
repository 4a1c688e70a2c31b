use crate::api::client::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use crate::error::WorktraceError;
use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Legacy plain-text token; moved into the keyring on load
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries for read requests only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Skip the OS keyring entirely (CI, containers)
    #[serde(default = "default_use_keyring")]
    pub use_keyring: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_use_keyring() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            use_keyring: default_use_keyring(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    /// How often `wt watch` refetches the authoritative timer list
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StateConfig {
    /// Optional override for state directory (for testing)
    pub state_dir_override: Option<PathBuf>,
}

impl ApiConfig {
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("api.base_url must start with http:// or https://, got '{}'", url);
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("display.poll_interval_secs must be at least 1");
        }
        if !(1..=1000).contains(&self.page_size) {
            anyhow::bail!("display.page_size must be between 1 and 1000");
        }
        Ok(())
    }
}

impl Config {
    /// API token from the keyring entry for `api.base_url`, then config file.
    pub fn get_token(&self) -> Result<String> {
        if self.api.use_keyring {
            match crate::keyring::get_api_token(&self.api.base_url) {
                Ok(Some(token)) => return Ok(token),
                Ok(None) => {}
                Err(e) => tracing::warn!("Keyring unavailable: {:#}", e),
            }
        }

        if let Some(token) = &self.api.token {
            return Ok(token.clone());
        }

        Err(WorktraceError::MissingToken.into())
    }

    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.display.validate()?;
        Ok(())
    }

    /// Move a plain-text token into the keyring
    pub fn migrate_credentials(&mut self) -> Result<bool> {
        if !self.api.use_keyring {
            return Ok(false);
        }

        let mut migrated = false;

        if let Some(token) = &self.api.token {
            crate::keyring::store_api_token(&self.api.base_url, token)
                .context("Failed to store API token in keyring")?;
            self.api.token = None;
            migrated = true;
        }

        Ok(migrated)
    }
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(home::home_dir()
        .context("Could not find home directory")?
        .join(".worktrace"))
}

pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let loader = ConfigBuilder::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
        .build()
        .context("Failed to build config loader")?;

    loader
        .try_deserialize()
        .context("Failed to parse config file")
}

pub fn load() -> Result<Config> {
    let config_path = config_dir()?.join("config.toml");

    let mut config = load_from_path(&config_path)?;

    config.validate()?;

    if config.migrate_credentials()? {
        tracing::info!("Migrated API token to secure storage");
        save_to_path(&config, &config_path)?;
    }

    Ok(config)
}

pub fn save_to_path<P: AsRef<Path>>(config: &Config, path: P) -> Result<()> {
    let toml_string = toml::to_string_pretty(config).context("Failed to serialize config")?;

    std::fs::write(path.as_ref(), toml_string).context("Failed to write config file")?;

    Ok(())
}
