//! Core rate-resolution abstractions

pub mod cache;
pub mod config;
pub mod error;
pub mod log;
pub mod provider;
pub mod rate;
pub mod resolver;
pub mod store;
pub mod sync;
pub mod task;

// Re-export main types for cleaner imports
pub use cache::RateCache;
pub use error::{RateError, StoreError};
pub use provider::{RateAdapter, RateProvider};
pub use rate::{CurrencyCode, ProviderSnapshot, RateQuote, RateRecord, pair_key};
pub use resolver::RateResolver;
pub use store::{RateStore, StoredRate};
pub use sync::{BackgroundSynchronizer, SyncHandle, SyncReport};
