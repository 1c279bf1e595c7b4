use crate::core::error::StoreError;
use crate::core::rate::{CurrencyCode, RateRecord, pair_key};
use crate::core::store::{RateStore, StoredRate, check_record};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const RATES_PARTITION: &str = "rates";

/// Persistent rate store on a fjall keyspace.
///
/// Rows live in the `rates` partition keyed by `BASE_TARGET` with a JSON
/// encoded [`StoredRate`] as value.
pub struct DiskRateStore {
    keyspace: Keyspace,
    rates: PartitionHandle,
    next_id: AtomicU64,
}

impl DiskRateStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path)?;

        let keyspace = Config::new(path).open()?;
        let rates = keyspace.open_partition(RATES_PARTITION, PartitionCreateOptions::default())?;

        let mut max_id = 0;
        for item in rates.iter() {
            let (_, value) = item?;
            let row: StoredRate = serde_json::from_slice(&value)?;
            max_id = max_id.max(row.id);
        }
        debug!(path = %path.display(), max_id, "Opened rate store");

        Ok(Self {
            keyspace,
            rates,
            next_id: AtomicU64::new(max_id + 1),
        })
    }

    pub fn row(
        &self,
        base: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<Option<StoredRate>, StoreError> {
        self.row_by_key(&pair_key(base, target))
    }

    fn row_by_key(&self, key: &str) -> Result<Option<StoredRate>, StoreError> {
        match self.rates.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.rates.len()?)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.rates.is_empty()?)
    }
}

#[async_trait]
impl RateStore for DiskRateStore {
    async fn upsert(&self, record: &RateRecord) -> Result<(), StoreError> {
        check_record(record)?;
        let key = record.key();
        // Read-then-write without a row lock; racing writers of one pair are
        // last-write-wins.
        let id = match self.row_by_key(&key)? {
            Some(existing) => existing.id,
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        let row = StoredRate::from_record(id, record);
        self.rates.insert(key.as_str(), serde_json::to_vec(&row)?)?;
        debug!("Store UPSERT for key: {}", key);
        Ok(())
    }

    async fn find_direct(
        &self,
        base: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<Option<RateRecord>, StoreError> {
        Ok(self.row(base, target)?.map(|row| row.to_record()))
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}
