//! # Rotor Coordinator - one-shot reconciler
//!
//! Reads every host from the Registry, compares its expected secret hash
//! with the Agent's latest report in the Ledger, and rotates the secret
//! only where the two agree. Holds no state between runs; schedule it
//! externally (cron, systemd timer, etc.).
//!
//! ## Architecture
//! ```text
//! Registry ──(expected)──┐
//!                        ├─→ Coordinator ──(rotation RPC)──→ Agent
//! Ledger ───(observed)───┘        │
//!                                 └──(hash(new) on confirm)──→ Registry
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rotor_store::{RedisLedger, RedisRegistry};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod reconcile;
mod rpc;

use config::AppConfig;
use reconcile::Reconciler;
use rpc::HttpAgentClient;

/// Rotor Coordinator - one-shot reconciler
#[derive(Parser, Debug)]
#[command(name = "rotor-coordinator")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/coordinator.toml")]
    config: String,

    /// Registry Redis URL (overrides config)
    #[arg(long, env = "ROTOR_REGISTRY_URL")]
    registry_url: Option<String>,

    /// Ledger Redis URL (overrides config)
    #[arg(long, env = "ROTOR_LEDGER_URL")]
    ledger_url: Option<String>,

    /// Observation window in seconds (overrides config)
    #[arg(long)]
    observation_window_secs: Option<u64>,

    /// Hosts reconciled in parallel (overrides config)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Do not adopt first observations for unenrolled hosts
    #[arg(long, default_value = "false")]
    no_seed: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🧭 Starting Rotor Coordinator v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    let registry = RedisRegistry::connect(&config.registry_url)
        .await
        .context("Failed to connect to Registry")?;
    let ledger = RedisLedger::connect(&config.ledger_url)
        .await
        .context("Failed to connect to Ledger")?;
    let agents = HttpAgentClient::new(config.rpc_timeout())?;
    info!("✅ Stores connected");

    let reconciler = Reconciler::new(
        Arc::new(registry),
        Arc::new(ledger),
        Arc::new(agents),
        config.reconcile(),
    );

    let report = reconciler
        .run_cycle()
        .await
        .context("Reconciliation cycle aborted: could not list hosts")?;

    for (host_id, outcome) in &report.outcomes {
        tracing::debug!(host_id = %host_id, outcome = %outcome, "Host reconciled");
    }

    let summary = report.summary();
    info!(
        hosts = summary.hosts,
        rotated = summary.rotated,
        seeded = summary.seeded,
        no_recent_observation = summary.no_recent_observation,
        unseeded = summary.unseeded,
        mismatch = summary.mismatch,
        rotation_rejected = summary.rotation_rejected,
        fault = summary.fault,
        "👋 Reconciliation cycle complete"
    );

    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
