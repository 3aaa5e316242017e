//! Secret hashing, generation, and comparison.
//!
//! Every authorization decision in Rotor goes through [`constant_time_eq`];
//! plain `==` on secrets or hashes is never used for a gate.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::constants::{HOST_ID_BYTES, SECRET_BYTES};
use crate::types::{HostId, SecretHash};

/// One-way hash of a secret: lowercase hex SHA-256 of its raw bytes.
///
/// Secrets are opaque byte strings; nothing here assumes UTF-8.
pub fn hash_secret(secret: impl AsRef<[u8]>) -> SecretHash {
    let digest = Sha256::digest(secret.as_ref());
    SecretHash::from_digest(hex::encode(digest))
}

/// Generate a fresh secret from the OS CSPRNG, hex encoded.
pub fn generate_secret() -> String {
    random_hex(SECRET_BYTES)
}

/// Generate a short random host identifier.
pub fn generate_host_id() -> HostId {
    HostId::from_generated(random_hex(HOST_ID_BYTES))
}

/// Compare two byte strings without an early exit on the first difference.
///
/// Lengths are compared first; only the length (never the content) leaks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
