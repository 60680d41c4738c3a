//! ClusterClient trait for mocking
//!
//! This trait abstracts the Kubernetes calls made by the initializers so
//! reconcilers can run against an in-memory mock in unit tests.

use crate::error::ClusterError;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// A namespaced resource the client can replace.
pub trait NamespacedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> NamespacedObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Trait for Kubernetes API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Create calls report an existing object as `ClusterError::AlreadyExists`;
/// callers decide whether that counts as success.
#[async_trait::async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create a cluster-scoped namespace
    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, ClusterError>;

    /// Create a role binding inside `namespace`
    async fn create_role_binding(
        &self,
        namespace: &str,
        binding: &RoleBinding,
    ) -> Result<RoleBinding, ClusterError>;

    /// Create a secret inside `namespace`
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, ClusterError>;

    /// Replace a whole object, guarded by its `resourceVersion`
    async fn replace<K: NamespacedObject>(&self, object: &K) -> Result<K, ClusterError>;
}
