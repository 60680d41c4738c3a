//! Provisioner capability.
//!
//! Each controller binary supplies one implementation that creates the
//! dependent resources for a single object. The reconciler may call it
//! again for an object it already provisioned (watch latency, failed
//! commit), so every create must accept "already exists" as success.

use crate::error::ControllerError;
use cluster_client::ClusterError;
use crds::Initializable;
use std::collections::BTreeMap;

/// Label key stamped on every dependent resource
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Creates the dependent resources of one object.
#[async_trait::async_trait]
pub trait Provisioner: Send + Sync {
    /// Custom resource kind this provisioner initializes
    type Resource: Initializable;

    /// Idempotently provisions everything `object` depends on.
    async fn provision(&self, object: &Self::Resource) -> Result<(), ControllerError>;
}

/// Result of an idempotent create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The resource was created by this call
    Created,
    /// The resource was already present
    AlreadyExisted,
}

/// Treats `AlreadyExists` as success; every other error is passed through.
pub fn tolerate_existing<T>(result: Result<T, ClusterError>) -> Result<Outcome, ClusterError> {
    match result {
        Ok(_) => Ok(Outcome::Created),
        Err(e) if e.is_already_exists() => Ok(Outcome::AlreadyExisted),
        Err(e) => Err(e),
    }
}

/// Labels identifying the initializer that created a resource.
pub fn managed_by_labels(initializer_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(MANAGED_BY_LABEL.to_string(), initializer_name.to_string())])
}
