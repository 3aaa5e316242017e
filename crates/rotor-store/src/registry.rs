//! Registry: authoritative record of each host's address and expected
//! secret hash.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use rotor_common::constants::redis_keys::{
    FIELD_ADDRESS, FIELD_SECRET_HASH, REGISTRY_HOST_PREFIX, REGISTRY_INDEX,
};
use rotor_common::{HostId, HostRecord, SecretHash};
use std::collections::HashMap;

use crate::error::{StoreError, StoreResult};

/// Point-keyed access to the Registry.
///
/// Every mutation is a single update of one host's row; no operation
/// spans multiple hosts. The Registry never retries on its own.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Create a record for a host that has never registered.
    ///
    /// Fails with [`StoreError::AlreadyRegistered`] when the id exists; the
    /// existing record is left untouched.
    async fn register_new(&self, id: &HostId, address: &str) -> StoreResult<()>;

    /// Refresh the address of a known host. The expected hash is kept.
    async fn register_existing(&self, id: &HostId, address: &str) -> StoreResult<()>;

    /// Every registered host
    async fn list_all(&self) -> StoreResult<Vec<HostRecord>>;

    /// Expected hash for a host, `None` if it has not been enrolled yet
    async fn get_expected_hash(&self, id: &HostId) -> StoreResult<Option<SecretHash>>;

    /// Record the hash of a secret the Agent has confirmed it now holds
    async fn set_expected_hash(&self, id: &HostId, hash: &SecretHash) -> StoreResult<()>;

    /// Set the expected hash only if none is recorded yet.
    ///
    /// Returns `true` if this call wrote the value.
    async fn seed_expected_hash(&self, id: &HostId, hash: &SecretHash) -> StoreResult<bool>;
}

/// Create the record only when the key is absent; index it in the same step.
const REGISTER_NEW_LUA: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
redis.call('SADD', KEYS[2], ARGV[3])
return 1
"#;

/// Overwrite one field, but only on an existing record.
const UPDATE_FIELD_LUA: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
return 1
"#;

/// -1: no record, 0: hash already present, 1: seeded
const SEED_HASH_LUA: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return -1
end
local current = redis.call('HGET', KEYS[1], ARGV[1])
if current and current ~= '' then
    return 0
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
return 1
"#;

/// Registry backed by one Redis hash per host plus an index set
#[derive(Clone)]
pub struct RedisRegistry {
    redis: ConnectionManager,
    create_script: Script,
    update_script: Script,
    seed_script: Script,
}

impl RedisRegistry {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            create_script: Script::new(REGISTER_NEW_LUA),
            update_script: Script::new(UPDATE_FIELD_LUA),
            seed_script: Script::new(SEED_HASH_LUA),
        }
    }

    /// Connect to Redis (the connection manager reconnects on its own)
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self::new(redis))
    }

    fn host_key(id: &HostId) -> String {
        format!("{}{}", REGISTRY_HOST_PREFIX, id)
    }

    async fn update_field(&self, id: &HostId, field: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.redis.clone();
        let updated: i64 = self
            .update_script
            .key(Self::host_key(id))
            .arg(field)
            .arg(value)
            .invoke_async(&mut conn)
            .await?;

        if updated == 0 {
            return Err(StoreError::NotRegistered(id.clone()));
        }
        Ok(())
    }

    /// A listable record, or `None` (logged) if the row is missing or
    /// malformed. One bad row never hides the rest of the fleet.
    fn usable_record(id: HostId, fields: HashMap<String, String>) -> Option<HostRecord> {
        if fields.is_empty() {
            tracing::warn!(host_id = %id, "Indexed host has no record");
            return None;
        }

        match Self::parse_record(id, fields) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed host record");
                None
            }
        }
    }

    fn parse_record(id: HostId, fields: HashMap<String, String>) -> StoreResult<HostRecord> {
        let address = fields
            .get(FIELD_ADDRESS)
            .cloned()
            .ok_or_else(|| StoreError::InvalidRecord {
                key: Self::host_key(&id),
                reason: "missing address".to_string(),
            })?;

        let expected_hash = fields
            .get(FIELD_SECRET_HASH)
            .filter(|h| !h.is_empty())
            .map(|h| SecretHash::from_stored(h));

        Ok(HostRecord {
            host_id: id,
            address,
            expected_hash,
        })
    }
}

#[async_trait]
impl Registry for RedisRegistry {
    async fn register_new(&self, id: &HostId, address: &str) -> StoreResult<()> {
        let mut conn = self.redis.clone();
        let created: i64 = self
            .create_script
            .key(Self::host_key(id))
            .key(REGISTRY_INDEX)
            .arg(FIELD_ADDRESS)
            .arg(address)
            .arg(id.as_str())
            .invoke_async(&mut conn)
            .await?;

        if created == 0 {
            return Err(StoreError::AlreadyRegistered(id.clone()));
        }

        tracing::info!(host_id = %id, address = %address, "Host registered");
        Ok(())
    }

    async fn register_existing(&self, id: &HostId, address: &str) -> StoreResult<()> {
        self.update_field(id, FIELD_ADDRESS, address).await?;
        tracing::info!(host_id = %id, address = %address, "Host address refreshed");
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<HostRecord>> {
        let mut conn = self.redis.clone();
        let mut ids: Vec<String> = conn.smembers(REGISTRY_INDEX).await?;
        ids.sort();

        let mut records = Vec::with_capacity(ids.len());
        for raw in ids {
            let id = match HostId::parse(&raw) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(host_id = %raw, error = %e, "Skipping malformed index entry");
                    continue;
                }
            };

            let fields: HashMap<String, String> = conn.hgetall(Self::host_key(&id)).await?;
            if let Some(record) = Self::usable_record(id, fields) {
                records.push(record);
            }
        }

        Ok(records)
    }

    async fn get_expected_hash(&self, id: &HostId) -> StoreResult<Option<SecretHash>> {
        let mut conn = self.redis.clone();
        let fields: HashMap<String, String> = conn.hgetall(Self::host_key(id)).await?;

        if fields.is_empty() {
            return Err(StoreError::NotRegistered(id.clone()));
        }

        Ok(Self::parse_record(id.clone(), fields)?.expected_hash)
    }

    async fn set_expected_hash(&self, id: &HostId, hash: &SecretHash) -> StoreResult<()> {
        self.update_field(id, FIELD_SECRET_HASH, hash.as_str()).await
    }

    async fn seed_expected_hash(&self, id: &HostId, hash: &SecretHash) -> StoreResult<bool> {
        let mut conn = self.redis.clone();
        let seeded: i64 = self
            .seed_script
            .key(Self::host_key(id))
            .arg(FIELD_SECRET_HASH)
            .arg(hash.as_str())
            .invoke_async(&mut conn)
            .await?;

        match seeded {
            -1 => Err(StoreError::NotRegistered(id.clone())),
            0 => Ok(false),
            _ => Ok(true),
        }
    }
}
