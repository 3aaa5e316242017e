//! Host identity: created once, persisted, never regenerated while the
//! file exists.

use rotor_common::{HostId, RotorError, generate_host_id};
use std::io::ErrorKind;
use std::path::Path;

use crate::secret_store::write_atomic;

/// File mode for the identity file
const HOST_ID_FILE_MODE: u32 = 0o644;

/// Who this host is, and whether it has registered before
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub id: HostId,
    /// True when no identity was persisted yet
    pub is_new: bool,
}

/// Read the persisted id, or mint a candidate if there is none.
///
/// A freshly minted id is *not* written here; call [`persist`] once the
/// Registry has accepted it, so a colliding id never sticks.
pub async fn resolve(path: &Path) -> Result<HostIdentity, RotorError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(HostIdentity {
            id: HostId::parse(&raw)?,
            is_new: false,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(HostIdentity {
            id: generate_host_id(),
            is_new: true,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Mint a replacement candidate after a collision
pub fn regenerate() -> HostIdentity {
    HostIdentity {
        id: generate_host_id(),
        is_new: true,
    }
}

/// Persist an accepted id
pub async fn persist(path: &Path, id: &HostId) -> Result<(), RotorError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    write_atomic(path, id.as_str().as_bytes(), HOST_ID_FILE_MODE).await
}
