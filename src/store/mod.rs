pub mod disk;
pub mod memory;
pub mod remote;

use crate::core::config::{AppConfig, CacheBackend, StoreBackend};
use crate::core::{RateCache, RateStore};
use anyhow::{Context, Result};
use disk::DiskRateStore;
use memory::{MemoryRateCache, MemoryRateStore};
use remote::RedisRateCache;
use std::sync::Arc;
use tracing::info;

/// Builds the cache backend selected in the configuration.
pub async fn build_cache(config: &AppConfig) -> Result<Arc<dyn RateCache>> {
    match config.cache.backend {
        CacheBackend::Memory => {
            info!("Using in-memory rate cache");
            Ok(Arc::new(MemoryRateCache::new()))
        }
        CacheBackend::Redis => {
            let url = config
                .cache
                .redis_url
                .as_deref()
                .context("cache.redis_url is required for the redis cache backend")?;
            let cache = RedisRateCache::connect(url)
                .await
                .with_context(|| format!("Failed to connect to redis at {url}"))?;
            info!("Using redis rate cache");
            Ok(Arc::new(cache))
        }
    }
}

/// Builds the store backend selected in the configuration.
pub fn build_store(config: &AppConfig) -> Result<Arc<dyn RateStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory rate store");
            Ok(Arc::new(MemoryRateStore::new()))
        }
        StoreBackend::Disk => {
            let path = config.default_data_path()?;
            let store = DiskRateStore::open(&path)
                .with_context(|| format!("Failed to open rate store at {}", path.display()))?;
            info!(path = %path.display(), "Using disk rate store");
            Ok(Arc::new(store))
        }
    }
}
