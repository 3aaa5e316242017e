//! Configuration management for the Coordinator.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use rotor_common::constants::{
    DEFAULT_LEDGER_URL, DEFAULT_REGISTRY_URL, OBSERVATION_WINDOW_SECS, ROTATION_RPC_TIMEOUT_SECS,
};

use crate::reconcile::ReconcileConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Registry Redis URL
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Ledger Redis URL
    #[serde(default = "default_ledger_url")]
    pub ledger_url: String,

    /// Only observations newer than this many seconds count
    #[serde(default = "default_observation_window")]
    pub observation_window_secs: u64,

    /// Upper bound on one rotation RPC
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,

    /// Hosts reconciled in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Adopt the first fresh observation for unenrolled hosts
    #[serde(default = "default_seed_unenrolled")]
    pub seed_unenrolled: bool,
}

// Default value functions
fn default_registry_url() -> String { DEFAULT_REGISTRY_URL.to_string() }
fn default_ledger_url() -> String { DEFAULT_LEDGER_URL.to_string() }
fn default_observation_window() -> u64 { OBSERVATION_WINDOW_SECS }
fn default_rpc_timeout() -> u64 { ROTATION_RPC_TIMEOUT_SECS }
fn default_concurrency() -> usize { 1 }
fn default_seed_unenrolled() -> bool { true }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref registry_url) = args.registry_url {
            config.registry_url = registry_url.clone();
        }
        if let Some(ref ledger_url) = args.ledger_url {
            config.ledger_url = ledger_url.clone();
        }
        if let Some(window) = args.observation_window_secs {
            config.observation_window_secs = window;
        }
        if let Some(concurrency) = args.concurrency {
            config.concurrency = concurrency;
        }
        if args.no_seed {
            config.seed_unenrolled = false;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.observation_window_secs == 0 {
            anyhow::bail!("observation_window_secs must be greater than zero");
        }
        if self.rpc_timeout_secs == 0 {
            anyhow::bail!("rpc_timeout_secs must be greater than zero");
        }
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn reconcile(&self) -> ReconcileConfig {
        ReconcileConfig {
            observation_window: Duration::from_secs(self.observation_window_secs),
            concurrency: self.concurrency,
            seed_unenrolled: self.seed_unenrolled,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            ledger_url: default_ledger_url(),
            observation_window_secs: default_observation_window(),
            rpc_timeout_secs: default_rpc_timeout(),
            concurrency: default_concurrency(),
            seed_unenrolled: default_seed_unenrolled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let reconcile = config.reconcile();
        assert_eq!(reconcile.observation_window, Duration::from_secs(600));
        assert_eq!(reconcile.concurrency, 1);
        assert!(reconcile.seed_unenrolled);
        assert_eq!(config.rpc_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_values_rejected() {
        for config in [
            AppConfig { concurrency: 0, ..Default::default() },
            AppConfig { rpc_timeout_secs: 0, ..Default::default() },
            AppConfig { observation_window_secs: 0, ..Default::default() },
        ] {
            assert!(config.validate().is_err());
        }
    }
}
