//! # Rotor Store
//!
//! Access contracts for the two authoritative stores the Coordinator
//! reconciles:
//!
//! - [`Registry`] - durable `host-id -> (address, expected-hash)` mapping
//! - [`Ledger`] - append-only, time-indexed hash observations
//!
//! Each contract ships a Redis implementation for deployment and an
//! in-memory implementation for tests and local runs. Clients are
//! constructed explicitly and handed to whoever needs them.

pub mod error;
pub mod gateway;
pub mod ledger;
pub mod memory;
pub mod registry;

pub use error::{StoreError, StoreResult};
pub use gateway::{RegistrationGateway, RegistryGateway};
pub use ledger::{Ledger, RedisLedger};
pub use memory::{MemoryLedger, MemoryRegistry};
pub use registry::{RedisRegistry, Registry};
