use crate::core::RateCache;
use crate::core::rate::RateRecord;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, warn};

/// Rate cache backed by a Redis server.
///
/// Values are JSON encoded records written with `SET key value EX ttl`; the
/// server-side TTL is the only expiry mechanism.
pub struct RedisRateCache {
    connection: ConnectionManager,
}

impl RedisRateCache {
    pub async fn connect(url: &str) -> redis::RedisResult<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_connection_manager().await?;
        debug!("Connected to redis cache");
        Ok(Self { connection })
    }
}

#[async_trait]
impl RateCache for RedisRateCache {
    async fn get(&self, key: &str, _expiry: Duration) -> Option<RateRecord> {
        let mut connection = self.connection.clone();
        let raw: Option<String> = match connection.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Redis GET failed");
                return None;
            }
        };
        match raw {
            Some(raw) => {
                let record = decode(key, &raw);
                if record.is_some() {
                    debug!("Cache HIT for key: {}", key);
                }
                record
            }
            None => {
                debug!("Cache MISS for key: {}", key);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: RateRecord, expiry: Duration) {
        let payload = match serde_json::to_string(&value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode rate for redis");
                return;
            }
        };
        let mut connection = self.connection.clone();
        if let Err(e) = connection
            .set_ex::<_, _, ()>(key, payload, ttl_secs(expiry))
            .await
        {
            warn!(key, error = %e, "Redis SET failed");
            return;
        }
        debug!("Cache PUT for key: {}", key);
    }
}

fn decode(key: &str, raw: &str) -> Option<RateRecord> {
    match serde_json::from_str(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(key, error = %e, "Discarding undecodable cached rate");
            None
        }
    }
}

/// Redis rejects a zero TTL, so sub-second expiries round up to one second.
fn ttl_secs(expiry: Duration) -> u64 {
    expiry.as_secs().max(1)
}
