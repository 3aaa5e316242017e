//! Shared constants for Rotor components.

/// Default Redis URL for the Registry
pub const DEFAULT_REGISTRY_URL: &str = "redis://127.0.0.1:6379";

/// Default Redis URL for the Ledger
pub const DEFAULT_LEDGER_URL: &str = "redis://127.0.0.1:6379";

/// Default Agent HTTP listen address
pub const DEFAULT_AGENT_LISTEN_ADDR: &str = "0.0.0.0:5000";

/// Default location of the persisted host identifier
pub const DEFAULT_HOST_ID_FILE: &str = "/var/lib/rotor/host-id";

/// Default location of the live secret
pub const DEFAULT_SECRET_KEY_FILE: &str = "/etc/rotor/secret_key";

/// Agent hash report cadence (1 minute)
pub const REPORT_INTERVAL_SECS: u64 = 60;

/// Coordinator only trusts observations newer than this (10 minutes)
pub const OBSERVATION_WINDOW_SECS: u64 = 600;

/// Upper bound on a single rotation RPC
pub const ROTATION_RPC_TIMEOUT_SECS: u64 = 10;

/// Bytes of CSPRNG output per generated secret (hex doubles the length)
pub const SECRET_BYTES: usize = 32;

/// Bytes of CSPRNG output per generated host identifier
pub const HOST_ID_BYTES: usize = 3;

/// Longest host identifier accepted from the outside
pub const MAX_HOST_ID_LEN: usize = 64;

/// Ledger measurement name for secret hash observations
pub const HASH_MEASUREMENT: &str = "secret_key_hash";

/// Redis key prefixes
pub mod redis_keys {
    /// Registry record: rotor:registry:host:{host_id}
    pub const REGISTRY_HOST_PREFIX: &str = "rotor:registry:host:";

    /// Set of every registered host id
    pub const REGISTRY_INDEX: &str = "rotor:registry:hosts";

    /// Ledger series: rotor:ledger:{measurement}:{host_id}
    pub const LEDGER_PREFIX: &str = "rotor:ledger:";

    /// Registry record field holding the network address
    pub const FIELD_ADDRESS: &str = "address";

    /// Registry record field holding the expected secret hash
    pub const FIELD_SECRET_HASH: &str = "secret_hash";
}

/// Agent HTTP paths
pub mod paths {
    /// Rotation RPC
    pub const UPDATE_SECRET: &str = "/update_secret";
}
