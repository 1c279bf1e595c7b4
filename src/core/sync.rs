//! Periodic provider refresh into the cache and store tiers.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use super::cache::RateCache;
use super::error::RateError;
use super::provider::RateProvider;
use super::rate::{ProviderSnapshot, RateRecord};
use super::store::RateStore;
use super::task::spawn_supervised;
use crate::providers::util::with_retry;

/// Outcome of one fetch-and-propagate cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub cached: usize,
    pub stored: usize,
    pub failed: usize,
}

/// Pulls full snapshots from the provider and writes them to cache and store.
pub struct BackgroundSynchronizer {
    provider: Arc<dyn RateProvider>,
    cache: Arc<dyn RateCache>,
    store: Arc<dyn RateStore>,
    expiry: Duration,
    retries: usize,
    retry_delay: Duration,
}

impl BackgroundSynchronizer {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        cache: Arc<dyn RateCache>,
        store: Arc<dyn RateStore>,
        expiry: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            store,
            expiry,
            retries: 0,
            retry_delay: Duration::ZERO,
        }
    }

    /// Retries a failed fetch `retries` times within the same tick.
    pub fn with_retry(mut self, retries: usize, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    /// Runs one cycle: fetch a snapshot, then fan it out to cache and store.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn sync_once(&self) -> Result<SyncReport, RateError> {
        let provider: &dyn RateProvider = self.provider.as_ref();
        let snapshot = with_retry(
            move || provider.fetch_snapshot(),
            self.retries,
            self.retry_delay,
        )
        .await?;
        info!(pivot = %snapshot.pivot, rates = snapshot.len(), "Fetched rate snapshot");
        Ok(self.propagate(snapshot).await)
    }

    /// Writes every record of the snapshot to the cache and the store.
    ///
    /// Each side runs as its own supervised task, so a failure or panic on one
    /// side never blocks the other.
    pub async fn propagate(&self, snapshot: ProviderSnapshot) -> SyncReport {
        let records: Arc<Vec<RateRecord>> = Arc::new(snapshot.records().collect());

        let cache_task = spawn_supervised(
            "cache-sync",
            sync_to_cache(Arc::clone(&self.cache), Arc::clone(&records), self.expiry),
        );
        let store_task = spawn_supervised(
            "store-sync",
            sync_to_store(Arc::clone(&self.store), Arc::clone(&records)),
        );
        let (cached, stored) = tokio::join!(cache_task, store_task);

        let cached = cached.ok().flatten().unwrap_or(0);
        let (stored, failed) = stored
            .ok()
            .flatten()
            .unwrap_or((0, records.len()));

        let report = SyncReport {
            fetched: records.len(),
            cached,
            stored,
            failed,
        };
        info!(?report, "Propagated rate snapshot");
        report
    }

    /// Starts the periodic loop. The first cycle runs immediately.
    ///
    /// The loop stops when [`SyncHandle::shutdown`] is called or the handle is
    /// dropped; a cycle in flight at that point is abandoned.
    pub fn start(self: &Arc<Self>, interval: Duration) -> SyncHandle {
        let interval = if interval.is_zero() {
            warn!("Sync interval is zero, using one second");
            Duration::from_secs(1)
        } else {
            interval
        };
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let this = Arc::clone(self);

        let task = spawn_supervised("background-sync", async move {
            info!(interval_secs = interval.as_secs(), "Background sync started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {}
                }
                // A panicking cycle ends that tick only
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    outcome = AssertUnwindSafe(this.tick()).catch_unwind() => {
                        if outcome.is_err() {
                            error!("Sync tick panicked, waiting for the next tick");
                        }
                    }
                }
            }
            info!("Background sync stopped");
        });

        SyncHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn tick(&self) {
        debug!("Auto sync rates to the store and cache");
        if let Err(e) = self.sync_once().await {
            warn!(error = %e, "Sync tick skipped");
        }
    }
}

async fn sync_to_cache(
    cache: Arc<dyn RateCache>,
    records: Arc<Vec<RateRecord>>,
    expiry: Duration,
) -> usize {
    for record in records.iter() {
        cache.set(&record.key(), record.clone(), expiry).await;
    }
    debug!(count = records.len(), "Synced rates to cache");
    records.len()
}

async fn sync_to_store(store: Arc<dyn RateStore>, records: Arc<Vec<RateRecord>>) -> (usize, usize) {
    let mut stored = 0;
    let mut failed = 0;
    for record in records.iter() {
        match store.upsert(record).await {
            Ok(()) => stored += 1,
            Err(e) => {
                warn!(key = %record.key(), error = %e, "Failed to store rate");
                failed += 1;
            }
        }
    }
    if let Err(e) = store.flush().await {
        warn!(error = %e, "Failed to flush rate store");
    }
    debug!(stored, failed, "Synced rates to store");
    (stored, failed)
}

/// Handle to a running background synchronizer.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Option<()>>,
}

impl SyncHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the loop to stop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Background sync task did not exit cleanly");
        }
    }
}
