//! # Rotor Agent - per-host secret holder
//!
//! Owns the live secret on one host. Serves the rotation RPC (guarded by
//! knowledge of the current secret) and reports a one-way hash of the
//! secret to the Ledger on a fixed cadence.
//!
//! ## Architecture
//! ```text
//!              rotation RPC
//! Coordinator ─────────────→ Agent ──(hash every 60s)──→ Ledger
//!                              │
//!                              └──(startup registration)──→ Registry
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rotor_store::{RedisLedger, RedisRegistry, RegistryGateway};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod bootstrap;
mod config;
mod identity;
mod reporter;
mod routes;
mod secret_store;
mod state;

use config::AppConfig;
use secret_store::SecretStore;
use state::AppState;

/// Rotor Agent - per-host secret holder
#[derive(Parser, Debug)]
#[command(name = "rotor-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/agent.toml")]
    config: String,

    /// Registry Redis URL (overrides config)
    #[arg(long, env = "ROTOR_REGISTRY_URL")]
    registry_url: Option<String>,

    /// Ledger Redis URL (overrides config)
    #[arg(long, env = "ROTOR_LEDGER_URL")]
    ledger_url: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "ROTOR_LISTEN_ADDR")]
    listen: Option<String>,

    /// Address announced to the Registry (overrides config)
    #[arg(long, env = "ROTOR_ADVERTISE_ADDR")]
    advertise_addr: Option<String>,

    /// Secret file (overrides config)
    #[arg(long, env = "ROTOR_SECRET_KEY_FILE")]
    secret_key_file: Option<PathBuf>,

    /// Host id file (overrides config)
    #[arg(long, env = "ROTOR_HOST_ID_FILE")]
    host_id_file: Option<PathBuf>,

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

    info!("🔐 Starting Rotor Agent v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    // A secret must exist before anything is served or reported
    let secrets = Arc::new(SecretStore::new(&config.secret_key_file));
    secrets
        .read()
        .await
        .context("Refusing to start without a stored secret")?;
    info!("🔑 Secret present at {}", secrets.path().display());

    let registry = RedisRegistry::connect(&config.registry_url)
        .await
        .context("Failed to connect to Registry")?;
    let ledger = RedisLedger::connect(&config.ledger_url)
        .await
        .context("Failed to connect to Ledger")?;
    info!("✅ Stores connected");

    // Register before serving
    let gateway = RegistryGateway::new(registry);
    let identity = bootstrap::register(&gateway, &config.host_id_file, config.advertise_addr())
        .await?;

    let state = AppState::new(config.clone(), identity.id, secrets, Arc::new(ledger));

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Spawn hash reporter
    let reporter_state = state.clone();
    let reporter_shutdown = shutdown_tx.subscribe();
    let interval = config.report_interval();
    tokio::spawn(async move {
        reporter::reporter_worker(reporter_state, interval, reporter_shutdown).await;
    });

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("🚀 Agent listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("👋 Agent shutdown complete");
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
