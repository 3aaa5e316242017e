//! Registration gateway consumed by Agents at startup.
//!
//! An Agent announces `(host-id, address, is_new)` and gets back a plain
//! accept/reject. Lifecycle conflicts are rejections; storage faults are
//! errors.

use async_trait::async_trait;
use rotor_common::{HostId, Registration};

use crate::error::{StoreError, StoreResult};
use crate::registry::Registry;

#[async_trait]
pub trait RegistrationGateway: Send + Sync {
    /// Returns `Ok(true)` if the registration was accepted
    async fn register(&self, registration: &Registration) -> StoreResult<bool>;
}

/// Gateway that applies registrations straight to a [`Registry`]
pub struct RegistryGateway<R> {
    registry: R,
}

impl<R: Registry> RegistryGateway<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    fn rejected(id: &HostId, reason: &str) -> StoreResult<bool> {
        tracing::warn!(host_id = %id, reason = %reason, "Registration rejected");
        Ok(false)
    }
}

#[async_trait]
impl<R: Registry> RegistrationGateway for RegistryGateway<R> {
    async fn register(&self, registration: &Registration) -> StoreResult<bool> {
        let Registration { id, address, is_new } = registration;

        let result = if *is_new {
            self.registry.register_new(id, address).await
        } else {
            self.registry.register_existing(id, address).await
        };

        match result {
            Ok(()) => Ok(true),
            Err(StoreError::AlreadyRegistered(_)) => {
                Self::rejected(id, "id already exists, cannot register as new")
            }
            Err(StoreError::NotRegistered(_)) => {
                Self::rejected(id, "unknown id cannot re-register")
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRegistry;
    use rotor_common::hash_secret;

    fn registration(id: &str, address: &str, is_new: bool) -> Registration {
        Registration {
            id: HostId::parse(id).unwrap(),
            address: address.to_string(),
            is_new,
        }
    }

    #[tokio::test]
    async fn test_decision_table() {
        let registry = MemoryRegistry::new();
        let gateway = RegistryGateway::new(registry.clone());

        // unknown + existing -> reject
        assert!(!gateway.register(&registration("abc123", "10.0.0.5:5000", false)).await.unwrap());
        // unknown + new -> insert
        assert!(gateway.register(&registration("abc123", "10.0.0.5:5000", true)).await.unwrap());
        // known + new -> reject, untouched
        assert!(!gateway.register(&registration("abc123", "10.0.0.9:5000", true)).await.unwrap());
        // known + existing -> address refresh
        assert!(gateway.register(&registration("abc123", "10.0.0.6:5000", false)).await.unwrap());

        let record = registry
            .get(&HostId::parse("abc123").unwrap())
            .await
            .unwrap();
        assert_eq!(record.address, "10.0.0.6:5000");
    }

    #[tokio::test]
    async fn test_collision_does_not_clobber_hash() {
        let registry = MemoryRegistry::new();
        let id = HostId::parse("abc123").unwrap();
        registry.register_new(&id, "10.0.0.5:5000").await.unwrap();
        registry.set_expected_hash(&id, &hash_secret("s3cr3t")).await.unwrap();

        let gateway = RegistryGateway::new(registry.clone());
        assert!(!gateway.register(&registration("abc123", "10.0.0.7:5000", true)).await.unwrap());

        let record = registry.get(&id).await.unwrap();
        assert_eq!(record.address, "10.0.0.5:5000");
        assert_eq!(record.expected_hash, Some(hash_secret("s3cr3t")));
    }

    #[tokio::test]
    async fn test_storage_fault_is_error() {
        let registry = MemoryRegistry::new();
        registry.set_unavailable(true);
        let gateway = RegistryGateway::new(registry);

        let err = gateway
            .register(&registration("abc123", "10.0.0.5:5000", true))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
