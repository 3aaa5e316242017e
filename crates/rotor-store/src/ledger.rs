//! Ledger: append-only, time-indexed record of the hashes Agents report.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use rotor_common::constants::HASH_MEASUREMENT;
use rotor_common::constants::redis_keys::LEDGER_PREFIX;
use rotor_common::{HashObservation, HostId};
use std::time::Duration;

use crate::error::StoreResult;

/// Append/read access to hash observations.
///
/// Agents only write, the Coordinator only reads. Nothing in Rotor
/// mutates or deletes an observation; retention belongs to the store.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Append one observation
    async fn record(&self, observation: &HashObservation) -> StoreResult<()>;

    /// Most recent observation for `id` no older than `window`
    async fn latest_within(
        &self,
        id: &HostId,
        window: Duration,
    ) -> StoreResult<Option<HashObservation>>;
}

/// Earliest timestamp (epoch ms) still inside `window`
pub(crate) fn window_cutoff(window: Duration) -> i64 {
    let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
    chrono::Utc::now()
        .timestamp_millis()
        .saturating_sub(window_ms)
}

/// Ledger backed by one Redis sorted set per host, scored by timestamp
#[derive(Clone)]
pub struct RedisLedger {
    redis: ConnectionManager,
}

impl RedisLedger {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Connect to Redis (the connection manager reconnects on its own)
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self::new(redis))
    }

    fn series_key(id: &HostId) -> String {
        format!("{}{}:{}", LEDGER_PREFIX, HASH_MEASUREMENT, id)
    }
}

#[async_trait]
impl Ledger for RedisLedger {
    async fn record(&self, observation: &HashObservation) -> StoreResult<()> {
        let mut conn = self.redis.clone();
        let member = serde_json::to_string(observation)?;

        let _: () = conn
            .zadd(
                Self::series_key(&observation.host_id),
                member,
                observation.observed_at,
            )
            .await?;

        Ok(())
    }

    async fn latest_within(
        &self,
        id: &HostId,
        window: Duration,
    ) -> StoreResult<Option<HashObservation>> {
        let mut conn = self.redis.clone();
        let cutoff = window_cutoff(window);

        let members: Vec<String> = conn
            .zrevrangebyscore_limit(Self::series_key(id), "+inf", cutoff, 0, 1)
            .await?;

        match members.first() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }
}
