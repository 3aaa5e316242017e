//! Application state and shared resources.

use rotor_common::HostId;
use rotor_store::Ledger;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::AppConfig;
use crate::secret_store::SecretStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// This host's identity (Registry and Ledger key)
    pub host_id: HostId,

    /// The live secret
    pub secrets: Arc<SecretStore>,

    /// Where hash observations are reported
    pub ledger: Arc<dyn Ledger>,

    /// Counters exposed on /metrics
    pub stats: Arc<AgentStats>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        host_id: HostId,
        secrets: Arc<SecretStore>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            config,
            host_id,
            secrets,
            ledger,
            stats: Arc::new(AgentStats::default()),
        }
    }
}

/// Runtime statistics
#[derive(Default)]
pub struct AgentStats {
    /// Rotations applied
    pub rotations_accepted: AtomicU64,
    /// Rotations refused (bad credential or input)
    pub rotations_rejected: AtomicU64,
    /// Rotations that hit a storage fault
    pub rotations_failed: AtomicU64,
    /// Hash reports written to the Ledger
    pub reports_sent: AtomicU64,
    /// Hash reports that failed
    pub reports_failed: AtomicU64,
}

/// Point-in-time copy of [`AgentStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub rotations_accepted: u64,
    pub rotations_rejected: u64,
    pub rotations_failed: u64,
    pub reports_sent: u64,
    pub reports_failed: u64,
}

impl AgentStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            rotations_accepted: self.rotations_accepted.load(Ordering::Relaxed),
            rotations_rejected: self.rotations_rejected.load(Ordering::Relaxed),
            rotations_failed: self.rotations_failed.load(Ordering::Relaxed),
            reports_sent: self.reports_sent.load(Ordering::Relaxed),
            reports_failed: self.reports_failed.load(Ordering::Relaxed),
        }
    }
}
