//! External rate source abstractions.

use async_trait::async_trait;
use std::collections::HashMap;

use super::error::RateError;
use super::rate::{ProviderSnapshot, RateRecord, UnixTimestamp};

/// Fetches a full pivot-relative rate table from an external source.
///
/// Implementations do not retry; callers own the retry policy.
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_snapshot(&self) -> Result<ProviderSnapshot, RateError>;
}

/// Turns a provider-specific payload into records keyed by `pivot_code`.
pub trait RateAdapter<Raw>: Send + Sync {
    fn adapt(
        &self,
        raw: &Raw,
        fetched_at: UnixTimestamp,
    ) -> Result<HashMap<String, RateRecord>, RateError>;
}
