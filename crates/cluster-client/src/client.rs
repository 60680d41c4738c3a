//! kube-rs backed implementation of [`ClusterClient`].

use crate::cluster_trait::{ClusterClient, NamespacedObject};
use crate::error::ClusterError;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Kubernetes API client with a deadline on every call.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    timeout: Duration,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    /// Wraps `client`; each call fails with `ClusterError::Timeout` after `timeout`.
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn call<T, F>(&self, operation: &str, kind: &str, name: &str, fut: F) -> Result<T, ClusterError>
    where
        F: Future<Output = Result<T, kube::Error>> + Send,
    {
        debug!("{} {} {}", operation, kind, name);
        with_deadline(self.timeout, operation, kind, name, fut).await
    }
}

/// Runs one API call under `timeout` and classifies its failure.
pub async fn with_deadline<T, F>(
    timeout: Duration,
    operation: &str,
    kind: &str,
    name: &str,
    fut: F,
) -> Result<T, ClusterError>
where
    F: Future<Output = Result<T, kube::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|e| ClusterError::from_kube(e, kind, name)),
        Err(_) => Err(ClusterError::Timeout {
            operation: format!("{} {} {}", operation, kind, name),
            timeout,
        }),
    }
}

#[async_trait::async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let name = namespace.name_any();
        self.call("create", "Namespace", &name, async {
            api.create(&PostParams::default(), namespace).await
        })
        .await
    }

    async fn create_role_binding(
        &self,
        namespace: &str,
        binding: &RoleBinding,
    ) -> Result<RoleBinding, ClusterError> {
        let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        let name = format!("{}/{}", namespace, binding.name_any());
        self.call("create", "RoleBinding", &name, async {
            api.create(&PostParams::default(), binding).await
        })
        .await
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, ClusterError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let name = format!("{}/{}", namespace, secret.name_any());
        self.call("create", "Secret", &name, async {
            api.create(&PostParams::default(), secret).await
        })
        .await
    }

    async fn replace<K: NamespacedObject>(&self, object: &K) -> Result<K, ClusterError> {
        let namespace = object.namespace().unwrap_or_else(|| "default".to_string());
        let name = object.name_any();
        let kind = K::kind(&()).to_string();
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        let qualified = format!("{}/{}", namespace, name);
        self.call("replace", &kind, &qualified, async {
            api.replace(&name, &PostParams::default(), object).await
        })
        .await
    }
}
