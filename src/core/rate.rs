//! Rate data model shared by the cache, store, provider and resolver.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::error::RateError;

/// Unix timestamp in seconds.
pub type UnixTimestamp = i64;

pub fn now_unix() -> UnixTimestamp {
    Utc::now().timestamp()
}

/// Rounds `value` to `places` decimal digits, half away from zero.
pub fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// An uppercase ISO-style currency code such as `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: &str) -> Result<Self, RateError> {
        let code = code.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RateError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = RateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// Cache and store key for a pair, `"<BASE>_<TARGET>"`.
///
/// Pivot-relative keys use the pivot as base, e.g. `USD_EUR`. Every reader and
/// writer of the cache goes through this function so the separator cannot drift.
pub fn pair_key(base: &CurrencyCode, target: &CurrencyCode) -> String {
    format!("{base}_{target}")
}

/// A direct or derived rate: one unit of `base` buys `rate` units of `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub base: CurrencyCode,
    pub target: CurrencyCode,
    pub rate: f64,
    pub updated_at: UnixTimestamp,
}

impl RateRecord {
    pub fn new(base: CurrencyCode, target: CurrencyCode, rate: f64, updated_at: UnixTimestamp) -> Self {
        Self {
            base,
            target,
            rate,
            updated_at,
        }
    }

    pub fn key(&self) -> String {
        pair_key(&self.base, &self.target)
    }

    /// Rejects zero, negative and non-finite rates.
    pub fn validate(&self) -> Result<(), RateError> {
        if self.rate.is_finite() && self.rate > 0.0 {
            Ok(())
        } else {
            Err(RateError::InvalidRate {
                pair: self.key(),
                rate: self.rate,
            })
        }
    }
}

/// The externally visible answer to a lookup, rate rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    pub base: CurrencyCode,
    pub target: CurrencyCode,
    pub rate: f64,
    pub updated_at: UnixTimestamp,
}

impl From<&RateRecord> for RateQuote {
    fn from(record: &RateRecord) -> Self {
        Self {
            base: record.base.clone(),
            target: record.target.clone(),
            rate: round(record.rate, 2),
            updated_at: record.updated_at,
        }
    }
}

impl From<RateRecord> for RateQuote {
    fn from(record: RateRecord) -> Self {
        Self::from(&record)
    }
}

/// A full pivot-relative rate table from one provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSnapshot {
    pub pivot: CurrencyCode,
    pub rates: HashMap<CurrencyCode, f64>,
    pub fetched_at: UnixTimestamp,
}

impl ProviderSnapshot {
    /// Builds a snapshot from adapter output keyed by `pivot_code`.
    ///
    /// Every record must share the same base and timestamp.
    pub fn from_records(records: HashMap<String, RateRecord>) -> Result<Self, RateError> {
        let mut iter = records.into_values();
        let first = iter
            .next()
            .ok_or_else(|| RateError::ProviderMalformed("snapshot contains no rates".into()))?;

        let pivot = first.base.clone();
        let fetched_at = first.updated_at;
        let mut rates = HashMap::new();
        rates.insert(first.target, first.rate);

        for record in iter {
            if record.base != pivot || record.updated_at != fetched_at {
                return Err(RateError::ProviderMalformed(format!(
                    "record {} does not belong to the {pivot} snapshot",
                    record.key()
                )));
            }
            rates.insert(record.target, record.rate);
        }

        Ok(Self {
            pivot,
            rates,
            fetched_at,
        })
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Expands the snapshot into pivot-relative records.
    pub fn records(&self) -> impl Iterator<Item = RateRecord> + '_ {
        self.rates.iter().map(|(target, rate)| {
            RateRecord::new(self.pivot.clone(), target.clone(), *rate, self.fetched_at)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    #[test]
    fn test_currency_code_normalizes() {
        assert_eq!(code(" eur ").as_str(), "EUR");
        assert!(matches!(
            CurrencyCode::new(""),
            Err(RateError::InvalidCurrency(_))
        ));
        assert!(matches!(
            CurrencyCode::new("US1"),
            Err(RateError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn test_pair_key_format() {
        assert_eq!(pair_key(&code("eur"), &code("usd")), "EUR_USD");
    }

    #[test]
    fn test_round() {
        assert_eq!(round(0.8 / 0.9, 2), 0.89);
        assert_eq!(round(1.005_1, 2), 1.01);
        assert_eq!(round(2.0, 2), 2.0);
    }

    #[test]
    fn test_quote_rounds_rate() {
        let record = RateRecord::new(code("USD"), code("JPY"), 151.23789, 42);
        let quote = RateQuote::from(&record);
        assert_eq!(quote.rate, 151.24);
        assert_eq!(quote.updated_at, 42);
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        let zero = RateRecord::new(code("USD"), code("EUR"), 0.0, 1);
        assert!(matches!(zero.validate(), Err(RateError::InvalidRate { .. })));
        let nan = RateRecord::new(code("USD"), code("EUR"), f64::NAN, 1);
        assert!(nan.validate().is_err());
        let ok = RateRecord::new(code("USD"), code("EUR"), 0.9, 1);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_record_json_shape() {
        let record = RateRecord::new(code("USD"), code("EUR"), 0.9, 10);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"base":"USD","target":"EUR","rate":0.9,"updated_at":10}"#
        );
        let invalid = r#"{"base":"U5D","target":"EUR","rate":0.9,"updated_at":10}"#;
        assert!(serde_json::from_str::<RateRecord>(invalid).is_err());
    }

    #[test]
    fn test_snapshot_from_records() {
        let mut records = HashMap::new();
        for (target, rate) in [("EUR", 0.9), ("GBP", 0.8), ("USD", 1.0)] {
            let record = RateRecord::new(code("USD"), code(target), rate, 100);
            records.insert(record.key(), record);
        }

        let snapshot = ProviderSnapshot::from_records(records).unwrap();
        assert_eq!(snapshot.pivot, code("USD"));
        assert_eq!(snapshot.fetched_at, 100);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.rates[&code("GBP")], 0.8);

        let mut keys: Vec<String> = snapshot.records().map(|r| r.key()).collect();
        keys.sort();
        assert_eq!(keys, vec!["USD_EUR", "USD_GBP", "USD_USD"]);
    }

    #[test]
    fn test_snapshot_rejects_mixed_pivots() {
        let mut records = HashMap::new();
        let a = RateRecord::new(code("USD"), code("EUR"), 0.9, 100);
        let b = RateRecord::new(code("EUR"), code("GBP"), 0.8, 100);
        records.insert(a.key(), a);
        records.insert(b.key(), b);

        assert!(matches!(
            ProviderSnapshot::from_records(records),
            Err(RateError::ProviderMalformed(_))
        ));
        assert!(ProviderSnapshot::from_records(HashMap::new()).is_err());
    }
}
