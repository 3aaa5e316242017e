//! Rotation RPC client (Coordinator -> Agent).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rotor_common::constants::paths::UPDATE_SECRET;
use rotor_common::{RotateRequest, RotorError};
use std::time::Duration;

/// Asks an Agent to swap its secret.
///
/// `Ok(())` means the Agent confirmed the swap. Every other outcome
/// (rejection, transport failure, timeout) is an error and must be treated
/// as "not rotated".
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn rotate(&self, address: &str, old_key: &str, new_key: &str) -> Result<(), RotorError>;
}

/// [`AgentClient`] over HTTP. One attempt per call, bounded by a timeout.
pub struct HttpAgentClient {
    http: Client,
}

impl std::fmt::Debug for HttpAgentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAgentClient").finish_non_exhaustive()
    }
}

impl HttpAgentClient {
    pub fn new(timeout: Duration) -> Result<Self, RotorError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RotorError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http })
    }
}

/// Rotation endpoint for an Agent address (`host:port` or a base URL)
pub fn rotation_url(address: &str) -> String {
    let base = address.trim().trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{}{}", base, UPDATE_SECRET)
    } else {
        format!("http://{}{}", base, UPDATE_SECRET)
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn rotate(&self, address: &str, old_key: &str, new_key: &str) -> Result<(), RotorError> {
        let url = rotation_url(address);
        let request = RotateRequest {
            old_key: old_key.to_string(),
            new_key: new_key.to_string(),
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RotorError::Timeout(format!("{url}: {e}"))
                } else {
                    RotorError::Rpc(format!("{url}: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::BAD_REQUEST => Err(RotorError::Unauthorized(body)),
            _ => Err(RotorError::Rpc(format!("{url} answered {status}: {body}"))),
        }
    }
}
