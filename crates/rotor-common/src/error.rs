//! Common error types for Rotor components.

use thiserror::Error;

/// Common errors across Rotor components
#[derive(Debug, Error)]
pub enum RotorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Registry/Ledger operation error
    #[error("Store error: {0}")]
    Store(String),

    /// Presented credential does not match the live secret
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid input/request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No secret on disk
    #[error("No secret stored at {0}")]
    MissingSecret(String),

    /// Local file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rotation RPC transport error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RotorError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Store(_) => 503,
            Self::Unauthorized(_) => 400,
            Self::InvalidInput(_) => 400,
            Self::MissingSecret(_) => 500,
            Self::Io(_) => 500,
            Self::Rpc(_) => 502,
            Self::Timeout(_) => 504,
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error should be retried
    ///
    /// Authorization failures are never retried automatically: the caller
    /// needs a fresh observation before it can present a new credential.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Io(_) | Self::Rpc(_) | Self::Timeout(_)
        )
    }
}
