//! # Rotor Common
//!
//! Shared types, primitives, and errors used across Rotor components.
//!
//! ## Modules
//! - `types` - Core data structures (HostId, SecretHash, HostRecord, etc.)
//! - `crypto` - Secret hashing, generation, and constant-time comparison
//! - `error` - Common error types
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod crypto;
pub mod error;
pub mod types;

pub use crypto::{constant_time_eq, generate_host_id, generate_secret, hash_secret};
pub use error::RotorError;
pub use types::*;
