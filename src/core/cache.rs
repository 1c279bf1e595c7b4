use async_trait::async_trait;
use std::time::Duration;

use super::rate::RateRecord;

/// Time-bounded key/value lookup for rate records.
///
/// Implementations never fail the caller: a backend error on `get` is a miss
/// and on `set` is logged and dropped.
#[async_trait]
pub trait RateCache: Send + Sync {
    /// Returns the record stored under `key` if it is still usable.
    ///
    /// In-process caches compare the entry age against `expiry`; remote caches
    /// rely on the TTL set at write time and ignore it.
    async fn get(&self, key: &str, expiry: Duration) -> Option<RateRecord>;

    /// Unconditionally overwrites `key`.
    async fn set(&self, key: &str, value: RateRecord, expiry: Duration);
}
