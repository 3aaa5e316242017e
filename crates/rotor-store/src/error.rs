//! Store error types.

use rotor_common::{HostId, RotorError};
use thiserror::Error;

/// Errors surfaced by Registry and Ledger operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis connection/operation error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Stored value could not be encoded/decoded
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// `register_new` for an id that already has a record
    #[error("Host {0} is already registered")]
    AlreadyRegistered(HostId),

    /// Operation on an id with no record
    #[error("Host {0} is not registered")]
    NotRegistered(HostId),

    /// A stored record is malformed
    #[error("Invalid record for {key}: {reason}")]
    InvalidRecord { key: String, reason: String },
}

impl StoreError {
    /// Storage faults are safe to retry on the next cycle; lifecycle
    /// conflicts are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Redis(_))
    }
}

impl From<StoreError> for RotorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyRegistered(_) | StoreError::NotRegistered(_) => {
                RotorError::InvalidInput(err.to_string())
            }
            other => RotorError::Store(other.to_string()),
        }
    }
}

/// Result type alias using StoreError
pub type StoreResult<T> = Result<T, StoreError>;
