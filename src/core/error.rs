//! Error types for rate resolution, providers and stores.

use thiserror::Error;

use super::rate::CurrencyCode;

/// Errors surfaced by rate lookups and provider fetches.
#[derive(Debug, Error)]
pub enum RateError {
    /// No direct or pivot-derivable rate exists for the currency.
    #[error("provided currency {0} is currently not supported")]
    NotFound(CurrencyCode),

    /// A zero, negative or non-finite rate reached a cross-rate division.
    #[error("invalid rate {rate} for {pair}")]
    InvalidRate { pair: String, rate: f64 },

    /// The caller passed something that is not a currency code.
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// Network or transport failure talking to the provider.
    #[error("rate provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider answered with a payload we could not decode.
    #[error("rate provider returned malformed data: {0}")]
    ProviderMalformed(String),
}

impl RateError {
    /// True for the errors a transport reports as "not found" rather than a
    /// generic failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidCurrency(_))
    }
}

/// Errors from a persistent rate store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[from] fjall::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode stored rate: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("refusing to store invalid rate {rate} for {pair}")]
    InvalidRecord { pair: String, rate: f64 },
}
