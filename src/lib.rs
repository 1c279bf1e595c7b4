pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{BackgroundSynchronizer, RateCache, RateResolver, RateStore};
use crate::providers::OpenExchangeProvider;
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Rate { base: String, target: String },
    Sync,
    Watch { interval_minutes: Option<u64> },
}

/// The wired service: one cache, one store and the resolver reading them.
pub struct App {
    pub config: AppConfig,
    pub cache: Arc<dyn RateCache>,
    pub store: Arc<dyn RateStore>,
    pub resolver: Arc<RateResolver>,
}

impl App {
    pub async fn build(config: AppConfig) -> Result<Self> {
        let cache = store::build_cache(&config).await?;
        let store = store::build_store(&config)?;
        let resolver = Arc::new(RateResolver::new(
            Arc::clone(&cache),
            Arc::clone(&store),
            config.pivot_currency()?,
            config.cache_expiry(),
        ));

        Ok(App {
            config,
            cache,
            store,
            resolver,
        })
    }

    /// Builds a synchronizer against the configured provider.
    pub fn synchronizer(&self) -> Result<Arc<BackgroundSynchronizer>> {
        let provider_config = &self.config.provider;
        if provider_config.app_id.trim().is_empty() {
            bail!(
                "provider.app_id is not set; add it to the config file or set {}",
                crate::core::config::APP_ID_ENV
            );
        }

        let provider = OpenExchangeProvider::new(
            &provider_config.base_url,
            &provider_config.app_id,
            Duration::from_secs(provider_config.timeout_secs),
        )
        .context("Failed to create rate provider")?;

        let synchronizer = BackgroundSynchronizer::new(
            Arc::new(provider),
            Arc::clone(&self.cache),
            Arc::clone(&self.store),
            self.config.cache_expiry(),
        )
        .with_retry(
            self.config.sync.retries,
            Duration::from_millis(self.config.sync.retry_delay_ms),
        );
        Ok(Arc::new(synchronizer))
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Rate keeper starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::build(config).await?;

    match command {
        AppCommand::Rate { base, target } => cli::rate::run(&app.resolver, &base, &target).await,
        AppCommand::Sync => {
            let synchronizer = app.synchronizer()?;
            cli::sync::run_once(&synchronizer).await
        }
        AppCommand::Watch { interval_minutes } => {
            let interval = interval_minutes
                .map(|minutes| Duration::from_secs(minutes * 60))
                .unwrap_or_else(|| app.config.sync_interval());
            let synchronizer = app.synchronizer()?;
            cli::sync::watch(&synchronizer, interval).await
        }
    }
}
