use crate::core::error::StoreError;
use crate::core::rate::{CurrencyCode, RateRecord, pair_key};
use crate::core::store::{RateStore, StoredRate, check_record};
use crate::core::RateCache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

struct CacheEntry {
    value: RateRecord,
    stored_at: Instant,
}

/// In-process rate cache with lazy expiry.
///
/// Entries are never swept; an entry older than the `expiry` passed to `get`
/// is reported as a miss. The tokio `RwLock` is write-preferring, so a steady
/// stream of readers cannot starve the synchronizer's writes.
pub struct MemoryRateCache {
    inner: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryRateCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

impl Default for MemoryRateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateCache for MemoryRateCache {
    async fn get(&self, key: &str, expiry: Duration) -> Option<RateRecord> {
        let cache = self.inner.read().await;
        match cache.get(key) {
            Some(entry) if entry.stored_at.elapsed() <= expiry => {
                debug!("Cache HIT for key: {}", key);
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("Cache entry expired for key: {}", key);
                None
            }
            None => {
                debug!("Cache MISS for key: {}", key);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: RateRecord, _expiry: Duration) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };
        let mut cache = self.inner.write().await;
        debug!("Cache PUT for key: {}", key);
        cache.insert(key.to_string(), entry);
    }
}

#[derive(Default)]
struct Rows {
    by_key: HashMap<String, StoredRate>,
    next_id: u64,
}

/// Volatile rate store with the same upsert semantics as the disk store.
#[derive(Default)]
pub struct MemoryRateStore {
    inner: RwLock<Rows>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn row(&self, base: &CurrencyCode, target: &CurrencyCode) -> Option<StoredRate> {
        self.inner
            .read()
            .await
            .by_key
            .get(&pair_key(base, target))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_key.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn upsert(&self, record: &RateRecord) -> Result<(), StoreError> {
        check_record(record)?;
        let mut rows = self.inner.write().await;
        let key = record.key();
        let existing = rows.by_key.get(&key).map(|row| row.id);
        let id = match existing {
            Some(id) => id,
            None => {
                rows.next_id += 1;
                rows.next_id
            }
        };
        debug!("Store UPSERT for key: {}", key);
        rows.by_key.insert(key, StoredRate::from_record(id, record));
        Ok(())
    }

    async fn find_direct(
        &self,
        base: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<Option<RateRecord>, StoreError> {
        Ok(self.row(base, target).await.map(|row| row.to_record()))
    }
}
