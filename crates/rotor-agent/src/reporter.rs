//! Periodic hash reporting to the Ledger.
//!
//! Best effort: a failed report is logged and counted, and the next tick
//! tries again. The Coordinator simply sees this host as stale meanwhile.

use anyhow::Result;
use rotor_common::{HashObservation, SecretHash};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::state::{AgentStats, AppState};

/// Hash the current secret and append it to the Ledger
pub async fn report_once(state: &AppState) -> Result<SecretHash> {
    let hash = state.secrets.current_hash().await?;
    let observation = HashObservation::now(state.host_id.clone(), hash.clone());
    state.ledger.record(&observation).await?;
    Ok(hash)
}

/// Background worker: report every `interval` until shutdown
pub async fn reporter_worker(
    state: AppState,
    interval: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        host_id = %state.host_id,
        interval = ?interval,
        "📡 Hash reporter started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match report_once(&state).await {
                    Ok(hash) => {
                        AgentStats::incr(&state.stats.reports_sent);
                        tracing::debug!(host_id = %state.host_id, hash = %hash.short(), "Reported secret hash");
                    }
                    Err(e) => {
                        AgentStats::incr(&state.stats.reports_failed);
                        tracing::warn!(host_id = %state.host_id, error = %e, "Failed to report secret hash");
                    }
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("📡 Hash reporter shutting down");
                break;
            }
        }
    }
}
