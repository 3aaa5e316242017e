//! Reconciliation cycle: compare Registry against Ledger for every host
//! and rotate only where they agree.
//!
//! Per host, in order:
//! 1. latest Ledger observation inside the window (none: skip, stale Agent)
//! 2. expected hash from the Registry
//! 3. observed != expected: skip, never overwrite either side
//! 4. generate a secret, ask the Agent to swap it in, presenting the
//!    agreed hash as the old credential
//! 5. only after the Agent confirms: write hash(new) to the Registry
//!
//! Nothing is committed to the Registry before the Agent confirms, so a
//! cycle can be cut off anywhere and the next one decides afresh from
//! current state. A fault on one host never touches the others; only a
//! failure to list hosts aborts the cycle.

use futures::StreamExt;
use rotor_common::{HostId, HostRecord, generate_secret, hash_secret};
use rotor_store::{Ledger, Registry, StoreResult};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::rpc::AgentClient;

/// Reconciliation tuning
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Observations older than this are ignored
    pub observation_window: Duration,
    /// Hosts reconciled at once (1 = sequential)
    pub concurrency: usize,
    /// Adopt the first fresh observation for hosts with no expected hash
    pub seed_unenrolled: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            observation_window: Duration::from_secs(
                rotor_common::constants::OBSERVATION_WINDOW_SECS,
            ),
            concurrency: 1,
            seed_unenrolled: true,
        }
    }
}

/// What one pass did to one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOutcome {
    /// Agent confirmed and the Registry now expects the new hash
    Rotated,
    /// First fresh observation adopted as the expected hash
    Seeded,
    /// No observation inside the window
    NoRecentObservation,
    /// No expected hash and seeding is off (or raced)
    Unseeded,
    /// Observed hash disagrees with the expected hash
    Mismatch,
    /// Agent refused, was unreachable, or timed out
    RotationRejected(String),
    /// Store fault for this host
    Fault(String),
}

impl HostOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rotated => "rotated",
            Self::Seeded => "seeded",
            Self::NoRecentObservation => "no_recent_observation",
            Self::Unseeded => "unseeded",
            Self::Mismatch => "mismatch",
            Self::RotationRejected(_) => "rotation_rejected",
            Self::Fault(_) => "fault",
        }
    }
}

impl fmt::Display for HostOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RotationRejected(reason) | Self::Fault(reason) => {
                write!(f, "{}: {}", self.label(), reason)
            }
            _ => f.write_str(self.label()),
        }
    }
}

/// Outcome of every host in one cycle, ordered by host id
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub outcomes: Vec<(HostId, HostOutcome)>,
}

/// Per-outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub hosts: usize,
    pub rotated: usize,
    pub seeded: usize,
    pub no_recent_observation: usize,
    pub unseeded: usize,
    pub mismatch: usize,
    pub rotation_rejected: usize,
    pub fault: usize,
}

impl CycleReport {
    #[cfg(test)]
    pub fn outcome(&self, id: &HostId) -> Option<&HostOutcome> {
        self.outcomes
            .iter()
            .find(|(host, _)| host == id)
            .map(|(_, outcome)| outcome)
    }

    pub fn summary(&self) -> CycleSummary {
        let mut summary = CycleSummary {
            hosts: self.outcomes.len(),
            ..Default::default()
        };
        for (_, outcome) in &self.outcomes {
            match outcome {
                HostOutcome::Rotated => summary.rotated += 1,
                HostOutcome::Seeded => summary.seeded += 1,
                HostOutcome::NoRecentObservation => summary.no_recent_observation += 1,
                HostOutcome::Unseeded => summary.unseeded += 1,
                HostOutcome::Mismatch => summary.mismatch += 1,
                HostOutcome::RotationRejected(_) => summary.rotation_rejected += 1,
                HostOutcome::Fault(_) => summary.fault += 1,
            }
        }
        summary
    }
}

/// Stateless reconciler over explicitly provided clients
pub struct Reconciler {
    registry: Arc<dyn Registry>,
    ledger: Arc<dyn Ledger>,
    agents: Arc<dyn AgentClient>,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(
        registry: Arc<dyn Registry>,
        ledger: Arc<dyn Ledger>,
        agents: Arc<dyn AgentClient>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            agents,
            config,
        }
    }

    /// Run one cycle over every registered host.
    ///
    /// Fails only if the host list cannot be read.
    pub async fn run_cycle(&self) -> StoreResult<CycleReport> {
        let hosts = self.registry.list_all().await?;
        tracing::info!(hosts = hosts.len(), "🔄 Reconciliation cycle started");

        let mut outcomes: Vec<(HostId, HostOutcome)> = futures::stream::iter(hosts)
            .map(|host| async move {
                let outcome = self.reconcile_host(&host).await;
                (host.host_id, outcome)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        outcomes.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(CycleReport { outcomes })
    }

    /// Reconcile a single host. Never fails; faults become an outcome.
    pub async fn reconcile_host(&self, host: &HostRecord) -> HostOutcome {
        let id = &host.host_id;

        let observed = match self
            .ledger
            .latest_within(id, self.config.observation_window)
            .await
        {
            Ok(Some(observation)) => observation.hash,
            Ok(None) => {
                tracing::info!(host_id = %id, "No recent observation, skipping");
                return HostOutcome::NoRecentObservation;
            }
            Err(e) => {
                tracing::error!(host_id = %id, error = %e, "Failed to read Ledger");
                return HostOutcome::Fault(e.to_string());
            }
        };

        let expected = match self.registry.get_expected_hash(id).await {
            Ok(Some(hash)) => hash,
            Ok(None) => return self.enroll(id, &observed).await,
            Err(e) => {
                tracing::error!(host_id = %id, error = %e, "Failed to read expected hash");
                return HostOutcome::Fault(e.to_string());
            }
        };

        if !observed.ct_eq(&expected) {
            tracing::warn!(
                host_id = %id,
                observed = %observed.short(),
                expected = %expected.short(),
                "Secret hash mismatch (drift or concurrent rotation), not rotating"
            );
            return HostOutcome::Mismatch;
        }

        let new_secret = generate_secret();
        if let Err(e) = self
            .agents
            .rotate(&host.address, expected.as_str(), &new_secret)
            .await
        {
            tracing::warn!(
                host_id = %id,
                address = %host.address,
                error = %e,
                "Rotation rejected or Agent unreachable"
            );
            return HostOutcome::RotationRejected(e.to_string());
        }

        let new_hash = hash_secret(&new_secret);
        match self.registry.set_expected_hash(id, &new_hash).await {
            Ok(()) => {
                tracing::info!(
                    host_id = %id,
                    old = %expected.short(),
                    new = %new_hash.short(),
                    "🔑 Secret rotated"
                );
                HostOutcome::Rotated
            }
            Err(e) => {
                tracing::error!(
                    host_id = %id,
                    error = %e,
                    "Agent holds the new secret but the Registry update failed; host will show drift"
                );
                HostOutcome::Fault(e.to_string())
            }
        }
    }

    /// First contact: no expected hash recorded yet
    async fn enroll(&self, id: &HostId, observed: &rotor_common::SecretHash) -> HostOutcome {
        if !self.config.seed_unenrolled {
            tracing::info!(host_id = %id, "No expected hash and seeding disabled, skipping");
            return HostOutcome::Unseeded;
        }

        match self.registry.seed_expected_hash(id, observed).await {
            Ok(true) => {
                tracing::info!(host_id = %id, hash = %observed.short(), "🌱 Expected hash seeded");
                HostOutcome::Seeded
            }
            Ok(false) => {
                tracing::info!(host_id = %id, "Expected hash was seeded concurrently, skipping");
                HostOutcome::Unseeded
            }
            Err(e) => {
                tracing::error!(host_id = %id, error = %e, "Failed to seed expected hash");
                HostOutcome::Fault(e.to_string())
            }
        }
    }
}
