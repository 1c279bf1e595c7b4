use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::provider::{RateAdapter, RateProvider};
use crate::core::rate::{CurrencyCode, ProviderSnapshot, RateRecord, UnixTimestamp, now_unix};
use crate::core::RateError;

/// Payload of the Open Exchange Rates `latest.json` endpoint.
#[derive(Debug, Deserialize)]
pub struct OpenExchangeResponse {
    pub base: String,
    #[serde(default)]
    pub timestamp: i64,
    pub rates: HashMap<String, f64>,
}

/// Maps an [`OpenExchangeResponse`] to `pivot_code` keyed records.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenExchangeAdapter;

impl RateAdapter<OpenExchangeResponse> for OpenExchangeAdapter {
    fn adapt(
        &self,
        raw: &OpenExchangeResponse,
        fetched_at: UnixTimestamp,
    ) -> Result<HashMap<String, RateRecord>, RateError> {
        let pivot = CurrencyCode::new(&raw.base).map_err(|_| {
            RateError::ProviderMalformed(format!("invalid base currency {:?}", raw.base))
        })?;

        let mut records = HashMap::with_capacity(raw.rates.len());
        for (code, &rate) in &raw.rates {
            let Ok(target) = CurrencyCode::new(code) else {
                warn!(code = %code, "Skipping rate with invalid currency code");
                continue;
            };
            let record = RateRecord::new(pivot.clone(), target, rate, fetched_at);
            if record.validate().is_err() {
                warn!(key = %record.key(), rate, "Skipping non-positive rate");
                continue;
            }
            records.insert(record.key(), record);
        }

        if records.is_empty() {
            return Err(RateError::ProviderMalformed(format!(
                "no usable rates in {pivot} payload"
            )));
        }
        Ok(records)
    }
}

/// Fetches the latest rate table from Open Exchange Rates.
pub struct OpenExchangeProvider {
    base_url: String,
    app_id: String,
    client: reqwest::Client,
    adapter: OpenExchangeAdapter,
}

impl OpenExchangeProvider {
    pub fn new(base_url: &str, app_id: &str, timeout: Duration) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .user_agent("ratekeeper/1.0")
            .timeout(timeout)
            .build()
            .map_err(|e| RateError::ProviderUnavailable(format!("failed to build client: {e}")))?;
        Ok(OpenExchangeProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            client,
            adapter: OpenExchangeAdapter,
        })
    }
}

#[async_trait]
impl RateProvider for OpenExchangeProvider {
    fn name(&self) -> &str {
        "openexchangerates"
    }

    #[instrument(name = "OpenExchangeFetch", skip(self))]
    async fn fetch_snapshot(&self) -> Result<ProviderSnapshot, RateError> {
        let url = format!("{}/latest.json", self.base_url);
        debug!("Requesting rate table from {}", url);

        let response = self
            .client
            .get(format!("{url}?app_id={}", self.app_id))
            .send()
            .await
            .map_err(|e| RateError::ProviderUnavailable(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RateError::ProviderUnavailable(format!(
                "HTTP error: {} from {url}",
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RateError::ProviderUnavailable(format!("failed to read body: {e}")))?;

        let data: OpenExchangeResponse = serde_json::from_str(&text)
            .map_err(|e| RateError::ProviderMalformed(format!("failed to parse JSON response: {e}")))?;
        debug!(
            base = %data.base,
            provider_timestamp = data.timestamp,
            rates = data.rates.len(),
            "Received rate table"
        );

        let records = self.adapter.adapt(&data, now_unix())?;
        ProviderSnapshot::from_records(records)
    }
}
