//! Core types shared across Rotor components.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::MAX_HOST_ID_LEN;
use crate::crypto::constant_time_eq;
use crate::error::RotorError;

/// Short opaque identifier naming one fleet member.
///
/// Generated once per host and stable for its lifetime; the join key
/// between the Registry and the Ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostId(String);

impl HostId {
    /// Validate an identifier that came from outside the process
    pub fn parse(raw: &str) -> Result<Self, RotorError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RotorError::InvalidInput("host id is empty".to_string()));
        }
        if raw.len() > MAX_HOST_ID_LEN {
            return Err(RotorError::InvalidInput(format!(
                "host id longer than {MAX_HOST_ID_LEN} characters"
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(RotorError::InvalidInput(format!(
                "host id {raw:?} contains invalid characters"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub(crate) fn from_generated(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HostId {
    type Error = RotorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HostId> for String {
    fn from(id: HostId) -> Self {
        id.0
    }
}

/// One-way hash of a secret (lowercase hex SHA-256).
///
/// The Registry and Ledger only ever hold values of this type, never
/// the raw secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretHash(String);

impl SecretHash {
    pub(crate) fn from_digest(hex: String) -> Self {
        Self(hex)
    }

    /// Wrap a hash read back from a store. Case is normalised.
    pub fn from_stored(raw: &str) -> Self {
        Self(raw.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against another hash
    pub fn ct_eq(&self, other: &SecretHash) -> bool {
        constant_time_eq(self.0.as_bytes(), other.0.as_bytes())
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        self.0.get(..end).unwrap_or(&self.0)
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretHash({}…)", self.short())
    }
}

impl fmt::Display for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single `(host-id, hash, observed-at)` point reported by an Agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashObservation {
    /// Reporting host
    pub host_id: HostId,

    /// Hash of the secret the Agent held at `observed_at`
    pub hash: SecretHash,

    /// Observation time (Unix epoch milliseconds)
    pub observed_at: i64,
}

impl HashObservation {
    /// Observation stamped with the current time
    pub fn now(host_id: HostId, hash: SecretHash) -> Self {
        Self {
            host_id,
            hash,
            observed_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Registry row: where a host lives and which secret hash it should hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    pub host_id: HostId,

    /// `host:port` the Agent's rotation RPC listens on
    pub address: String,

    /// Unset until the first enrollment or rotation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<SecretHash>,
}

/// Rotation RPC request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateRequest {
    /// Credential proving knowledge of the current secret
    pub old_key: String,
    /// Replacement secret
    pub new_key: String,
}

/// Rotation RPC success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateResponse {
    pub status: String,
}

impl RotateResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

/// Registration request handed to the bootstrap gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: HostId,
    pub address: String,
    pub is_new: bool,
}
