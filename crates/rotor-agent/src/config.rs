//! Configuration management for the Agent.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rotor_common::constants::{
    DEFAULT_AGENT_LISTEN_ADDR, DEFAULT_HOST_ID_FILE, DEFAULT_LEDGER_URL, DEFAULT_REGISTRY_URL,
    DEFAULT_SECRET_KEY_FILE, REPORT_INTERVAL_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Registry Redis URL
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Ledger Redis URL
    #[serde(default = "default_ledger_url")]
    pub ledger_url: String,

    /// HTTP listen address for the rotation RPC
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// `host:port` announced to the Registry; the Coordinator dials this
    #[serde(default)]
    pub advertise_addr: Option<String>,

    /// Persisted host identifier
    #[serde(default = "default_host_id_file")]
    pub host_id_file: PathBuf,

    /// Live secret
    #[serde(default = "default_secret_key_file")]
    pub secret_key_file: PathBuf,

    /// Hash report cadence in seconds
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,

    /// Upper bound on any single HTTP request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

// Default value functions
fn default_registry_url() -> String { DEFAULT_REGISTRY_URL.to_string() }
fn default_ledger_url() -> String { DEFAULT_LEDGER_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_AGENT_LISTEN_ADDR.to_string() }
fn default_host_id_file() -> PathBuf { PathBuf::from(DEFAULT_HOST_ID_FILE) }
fn default_secret_key_file() -> PathBuf { PathBuf::from(DEFAULT_SECRET_KEY_FILE) }
fn default_report_interval() -> u64 { REPORT_INTERVAL_SECS }
fn default_request_timeout() -> u64 { 10 }

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
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ref advertise) = args.advertise_addr {
            config.advertise_addr = Some(advertise.clone());
        }
        if let Some(ref path) = args.secret_key_file {
            config.secret_key_file = path.clone();
        }
        if let Some(ref path) = args.host_id_file {
            config.host_id_file = path.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Refuse to start half-configured
    pub fn validate(&self) -> Result<()> {
        match self.advertise_addr.as_deref() {
            Some(addr) if !addr.trim().is_empty() => {}
            _ => anyhow::bail!("advertise_addr is not set (use --advertise-addr or ROTOR_ADVERTISE_ADDR)"),
        }
        if self.report_interval_secs == 0 {
            anyhow::bail!("report_interval_secs must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// The validated advertise address
    pub fn advertise_addr(&self) -> &str {
        self.advertise_addr.as_deref().unwrap_or_default().trim()
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            ledger_url: default_ledger_url(),
            listen_addr: default_listen_addr(),
            advertise_addr: None,
            host_id_file: default_host_id_file(),
            secret_key_file: default_secret_key_file(),
            report_interval_secs: default_report_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:5000");
        assert_eq!(config.report_interval(), Duration::from_secs(60));
        assert_eq!(config.secret_key_file, PathBuf::from("/etc/rotor/secret_key"));
    }

    #[test]
    fn test_advertise_addr_required() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_err());

        config.advertise_addr = Some("   ".to_string());
        assert!(config.validate().is_err());

        config.advertise_addr = Some("10.0.0.5:5000".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.advertise_addr(), "10.0.0.5:5000");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = AppConfig {
            advertise_addr: Some("10.0.0.5:5000".to_string()),
            report_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shipped_config_leaves_advertise_addr_unset() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../../../config/agent.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: AppConfig = settings.try_deserialize().unwrap();

        assert!(config.advertise_addr.is_none());
        assert!(config.validate().is_err());
    }
}
