//! Startup self-registration through the registration gateway.

use anyhow::{Context, Result, bail};
use rotor_common::Registration;
use rotor_store::RegistrationGateway;
use std::path::Path;

use crate::identity::{self, HostIdentity};

/// Fresh ids tried before giving up on repeated collisions
const MAX_NEW_ID_ATTEMPTS: usize = 3;

/// Register this host and return its accepted identity.
///
/// A brand-new id that collides with an existing record is replaced by a
/// fresh one and retried; it is only persisted once accepted. An existing
/// host that is rejected aborts startup.
pub async fn register(
    gateway: &dyn RegistrationGateway,
    host_id_file: &Path,
    advertise_addr: &str,
) -> Result<HostIdentity> {
    let mut identity = identity::resolve(host_id_file)
        .await
        .with_context(|| format!("Failed to read host id from {}", host_id_file.display()))?;

    for attempt in 1..=MAX_NEW_ID_ATTEMPTS {
        let registration = Registration {
            id: identity.id.clone(),
            address: advertise_addr.to_string(),
            is_new: identity.is_new,
        };

        let accepted = gateway
            .register(&registration)
            .await
            .context("Failed to reach the registration gateway")?;

        if accepted {
            if identity.is_new {
                identity::persist(host_id_file, &identity.id)
                    .await
                    .context("Failed to persist host id")?;
            }
            tracing::info!(
                host_id = %identity.id,
                address = %advertise_addr,
                is_new = identity.is_new,
                "✅ Registered with Registry"
            );
            return Ok(identity);
        }

        if !identity.is_new {
            bail!(
                "Registration rejected for existing host {} (unknown to the Registry)",
                identity.id
            );
        }

        tracing::warn!(
            host_id = %identity.id,
            attempt,
            "Host id collision, minting a new one"
        );
        identity = identity::regenerate();
    }

    bail!("Registration rejected after {MAX_NEW_ID_ATTEMPTS} new host ids")
}
