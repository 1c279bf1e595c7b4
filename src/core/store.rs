use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::rate::{CurrencyCode, RateRecord, UnixTimestamp};

/// A persisted direct pair with its stable row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRate {
    pub id: u64,
    pub base: CurrencyCode,
    pub target: CurrencyCode,
    pub rate: f64,
    pub updated_at: UnixTimestamp,
}

impl StoredRate {
    pub fn from_record(id: u64, record: &RateRecord) -> Self {
        Self {
            id,
            base: record.base.clone(),
            target: record.target.clone(),
            rate: record.rate,
            updated_at: record.updated_at,
        }
    }

    pub fn to_record(&self) -> RateRecord {
        RateRecord::new(
            self.base.clone(),
            self.target.clone(),
            self.rate,
            self.updated_at,
        )
    }
}

/// Persistent lookup and upsert of direct pairs keyed by `(base, target)`.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Inserts the pair, or updates `rate` and `updated_at` of the existing
    /// row in place keeping its id. Concurrent upserts of the same pair are
    /// last-write-wins.
    async fn upsert(&self, record: &RateRecord) -> Result<(), StoreError>;

    async fn find_direct(
        &self,
        base: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<Option<RateRecord>, StoreError>;

    /// Makes preceding upserts durable. No-op for volatile stores.
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub(crate) fn check_record(record: &RateRecord) -> Result<(), StoreError> {
    record.validate().map_err(|_| StoreError::InvalidRecord {
        pair: record.key(),
        rate: record.rate,
    })
}
