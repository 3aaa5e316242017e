//! In-memory Registry and Ledger.
//!
//! Same contracts as the Redis stores, held in process. Used by tests and
//! for single-process dry runs; nothing here survives a restart.

use async_trait::async_trait;
use rotor_common::{HashObservation, HostId, HostRecord, SecretHash};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::ledger::{Ledger, window_cutoff};
use crate::registry::Registry;

fn unavailable() -> StoreError {
    StoreError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "store unavailable",
    )))
}

/// In-memory [`Registry`]
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    records: Arc<RwLock<BTreeMap<HostId, HostRecord>>>,
    /// Successful writes, for asserting "no mutation" paths
    mutations: Arc<AtomicU64>,
    /// When set, every call fails like a dropped connection
    unavailable: Arc<AtomicBool>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one record
    pub async fn get(&self, id: &HostId) -> Option<HostRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// Insert or replace a record without going through the lifecycle
    /// checks or counting as a mutation.
    pub async fn insert(&self, record: HostRecord) {
        self.records
            .write()
            .await
            .insert(record.host_id.clone(), record);
    }

    /// Number of successful writes so far
    pub fn mutations(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Simulate a storage outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register_new(&self, id: &HostId, address: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut records = self.records.write().await;
        if records.contains_key(id) {
            return Err(StoreError::AlreadyRegistered(id.clone()));
        }

        records.insert(
            id.clone(),
            HostRecord {
                host_id: id.clone(),
                address: address.to_string(),
                expected_hash: None,
            },
        );
        self.mutated();
        Ok(())
    }

    async fn register_existing(&self, id: &HostId, address: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotRegistered(id.clone()))?;

        record.address = address.to_string();
        self.mutated();
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<HostRecord>> {
        self.check_available()?;
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn get_expected_hash(&self, id: &HostId) -> StoreResult<Option<SecretHash>> {
        self.check_available()?;
        self.records
            .read()
            .await
            .get(id)
            .map(|r| r.expected_hash.clone())
            .ok_or_else(|| StoreError::NotRegistered(id.clone()))
    }

    async fn set_expected_hash(&self, id: &HostId, hash: &SecretHash) -> StoreResult<()> {
        self.check_available()?;
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotRegistered(id.clone()))?;

        record.expected_hash = Some(hash.clone());
        self.mutated();
        Ok(())
    }

    async fn seed_expected_hash(&self, id: &HostId, hash: &SecretHash) -> StoreResult<bool> {
        self.check_available()?;
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotRegistered(id.clone()))?;

        if record.expected_hash.is_some() {
            return Ok(false);
        }

        record.expected_hash = Some(hash.clone());
        self.mutated();
        Ok(true)
    }
}

/// In-memory [`Ledger`]
#[derive(Clone, Default)]
pub struct MemoryLedger {
    series: Arc<RwLock<HashMap<HostId, Vec<HashObservation>>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every observation recorded for a host, oldest first
    pub async fn observations(&self, id: &HostId) -> Vec<HashObservation> {
        let mut points = self
            .series
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default();
        points.sort_by_key(|o| o.observed_at);
        points
    }

    /// Simulate a storage outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn record(&self, observation: &HashObservation) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        self.series
            .write()
            .await
            .entry(observation.host_id.clone())
            .or_default()
            .push(observation.clone());
        Ok(())
    }

    async fn latest_within(
        &self,
        id: &HostId,
        window: Duration,
    ) -> StoreResult<Option<HashObservation>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let cutoff = window_cutoff(window);
        Ok(self.series.read().await.get(id).and_then(|points| {
            points
                .iter()
                .filter(|o| o.observed_at >= cutoff)
                .max_by_key(|o| o.observed_at)
                .cloned()
        }))
    }
}
