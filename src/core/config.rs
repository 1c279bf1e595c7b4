use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

use super::rate::CurrencyCode;

/// Environment variable that overrides `provider.app_id`.
pub const APP_ID_ENV: &str = "OPENEXCHANGE_APP_ID";

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            backend: CacheBackend::Memory,
            expiry_secs: default_expiry_secs(),
            redis_url: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Disk,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Directory for the disk store; defaults to the platform data dir.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_provider_url(),
            app_id: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default)]
    pub retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            interval_minutes: default_interval_minutes(),
            retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_pivot")]
    pub pivot: String,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            pivot: default_pivot(),
            cache: CacheConfig::default(),
            store: StoreConfig::default(),
            provider: ProviderConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

fn default_pivot() -> String {
    "USD".to_string()
}

fn default_expiry_secs() -> u64 {
    3600
}

fn default_provider_url() -> String {
    "https://openexchangerates.org/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_interval_minutes() -> u64 {
    60
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "ratekeeper", "ratekeeper")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.store.path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "ratekeeper", "ratekeeper")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("rates"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(app_id) = lookup(APP_ID_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("Using provider app id from {}", APP_ID_ENV);
            self.provider.app_id = app_id;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.pivot_currency()?;
        if self.cache.expiry_secs == 0 {
            bail!("cache.expiry_secs must be greater than zero");
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.is_none() {
            bail!("cache.redis_url is required for the redis cache backend");
        }
        if self.sync.interval_minutes == 0 {
            bail!("sync.interval_minutes must be greater than zero");
        }
        Ok(())
    }

    pub fn pivot_currency(&self) -> Result<CurrencyCode> {
        CurrencyCode::new(&self.pivot)
            .with_context(|| format!("Invalid pivot currency: {:?}", self.pivot))
    }

    pub fn cache_expiry(&self) -> Duration {
        Duration::from_secs(self.cache.expiry_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_minutes * 60)
    }
}
