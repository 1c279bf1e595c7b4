//! Tiered rate resolution: cache, then store, deriving cross rates through
//! the pivot currency.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::cache::RateCache;
use super::error::RateError;
use super::rate::{CurrencyCode, RateQuote, RateRecord, pair_key};
use super::store::RateStore;

/// Derives `base -> target` from two pivot-relative records.
///
/// `pivot_to_base.target` becomes the base of the result and
/// `pivot_to_target.target` its target. The result is as fresh as the staler
/// input allows, i.e. it carries the later of the two timestamps.
pub fn cross_rate(
    pivot_to_base: &RateRecord,
    pivot_to_target: &RateRecord,
) -> Result<RateRecord, RateError> {
    pivot_to_base.validate()?;
    pivot_to_target.validate()?;

    let record = RateRecord::new(
        pivot_to_base.target.clone(),
        pivot_to_target.target.clone(),
        pivot_to_target.rate / pivot_to_base.rate,
        pivot_to_base.updated_at.max(pivot_to_target.updated_at),
    );
    // Finite positive inputs can still overflow
    record.validate()?;
    Ok(record)
}

/// Resolves `(base, target)` quotes from the cache and store tiers.
///
/// The resolver never calls the provider; the tiers are kept fresh by the
/// background synchronizer and a miss everywhere is `NotFound`.
pub struct RateResolver {
    cache: Arc<dyn RateCache>,
    store: Arc<dyn RateStore>,
    pivot: CurrencyCode,
    expiry: Duration,
}

impl RateResolver {
    pub fn new(
        cache: Arc<dyn RateCache>,
        store: Arc<dyn RateStore>,
        pivot: CurrencyCode,
        expiry: Duration,
    ) -> Self {
        Self {
            cache,
            store,
            pivot,
            expiry,
        }
    }

    pub fn pivot(&self) -> &CurrencyCode {
        &self.pivot
    }

    /// Resolves a quote for the pair, rate rounded to two decimals.
    #[instrument(skip(self))]
    pub async fn resolve(&self, base: &str, target: &str) -> Result<RateQuote, RateError> {
        let base = CurrencyCode::new(base)?;
        let target = CurrencyCode::new(target)?;
        let record = self.resolve_record(&base, &target).await?;
        Ok(RateQuote::from(&record))
    }

    /// Resolves the unrounded record for the pair.
    pub async fn resolve_record(
        &self,
        base: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<RateRecord, RateError> {
        if let Some(record) = self.from_cache(base, target).await? {
            return Ok(record);
        }
        self.from_store(base, target).await
    }

    async fn from_cache(
        &self,
        base: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<Option<RateRecord>, RateError> {
        let key = pair_key(base, target);
        if let Some(record) = self.cache.get(&key, self.expiry).await {
            debug!(key = %key, rate = record.rate, "Cache HIT");
            return Ok(Some(record));
        }

        // Both legs are read together; they may still come from different
        // refresh cycles since the cache has no joint snapshot.
        let base_key = pair_key(&self.pivot, base);
        let target_key = pair_key(&self.pivot, target);
        let (pivot_base, pivot_target) = tokio::join!(
            self.cache.get(&base_key, self.expiry),
            self.cache.get(&target_key, self.expiry),
        );

        match (pivot_base, pivot_target) {
            (Some(pivot_base), Some(pivot_target)) => {
                let record = self.derive(&pivot_base, &pivot_target).await?;
                debug!(key = %key, rate = record.rate, "Cache cross rate");
                Ok(Some(record))
            }
            _ => {
                debug!(key = %key, "Cache MISS");
                Ok(None)
            }
        }
    }

    async fn from_store(
        &self,
        base: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<RateRecord, RateError> {
        if *base == self.pivot {
            let record = self
                .find_in_store(base, target)
                .await
                .ok_or_else(|| RateError::NotFound(target.clone()))?;
            debug!(key = %record.key(), rate = record.rate, "Store HIT");
            self.cache.set(&record.key(), record.clone(), self.expiry).await;
            return Ok(record);
        }

        let (pivot_base, pivot_target) = tokio::join!(
            self.find_in_store(&self.pivot, base),
            self.find_in_store(&self.pivot, target),
        );
        let pivot_base = pivot_base.ok_or_else(|| RateError::NotFound(base.clone()))?;
        let pivot_target = pivot_target.ok_or_else(|| RateError::NotFound(target.clone()))?;

        let record = self.derive(&pivot_base, &pivot_target).await?;
        debug!(key = %record.key(), rate = record.rate, "Store cross rate");
        Ok(record)
    }

    /// Store read where a backend fault counts as a miss.
    async fn find_in_store(
        &self,
        base: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Option<RateRecord> {
        match self.store.find_direct(base, target).await {
            Ok(found) => found,
            Err(e) => {
                warn!(key = %pair_key(base, target), error = %e, "Store lookup failed");
                None
            }
        }
    }

    /// Computes the cross rate and memoizes it under `base_target`.
    async fn derive(
        &self,
        pivot_base: &RateRecord,
        pivot_target: &RateRecord,
    ) -> Result<RateRecord, RateError> {
        let record = cross_rate(pivot_base, pivot_target).inspect_err(|e| {
            warn!(error = %e, "Refusing to derive cross rate");
        })?;
        self.cache.set(&record.key(), record.clone(), self.expiry).await;
        Ok(record)
    }
}
