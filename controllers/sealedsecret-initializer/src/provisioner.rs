//! Secret unsealing.

use async_trait::async_trait;
use cluster_client::ClusterClient;
use crds::SealedSecret;
use initializer::{ControllerError, Outcome, Provisioner, managed_by_labels, tolerate_existing};
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info};

/// Creates the `Secret` backing a `SealedSecret`.
pub struct SealedSecretProvisioner<C: ClusterClient> {
    client: Arc<C>,
    initializer_name: String,
}

impl<C: ClusterClient> SealedSecretProvisioner<C> {
    /// Creates a provisioner labelling its secrets with `initializer_name`.
    pub fn new(client: Arc<C>, initializer_name: impl Into<String>) -> Self {
        Self {
            client,
            initializer_name: initializer_name.into(),
        }
    }

    /// Builds the secret for `sealed`: same name and namespace, data copied
    /// verbatim, controller owner reference back to `sealed`.
    pub fn secret_spec(&self, sealed: &SealedSecret) -> Result<Secret, ControllerError> {
        let owner = sealed.controller_owner_ref(&()).ok_or_else(|| {
            ControllerError::MissingMetadata(format!(
                "SealedSecret {} has no uid to own its Secret",
                sealed.name_any()
            ))
        })?;

        Ok(Secret {
            metadata: ObjectMeta {
                name: Some(sealed.name_any()),
                namespace: sealed.namespace(),
                labels: Some(managed_by_labels(&self.initializer_name)),
                owner_references: Some(vec![owner]),
                ..Default::default()
            },
            data: Some(sealed.spec.data.clone()),
            type_: Some("Opaque".to_string()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl<C: ClusterClient> Provisioner for SealedSecretProvisioner<C> {
    type Resource = SealedSecret;

    async fn provision(&self, sealed: &SealedSecret) -> Result<(), ControllerError> {
        let Some(namespace) = sealed.namespace() else {
            return Err(ControllerError::MissingMetadata(format!(
                "SealedSecret {} has no namespace",
                sealed.name_any()
            )));
        };
        let secret = self.secret_spec(sealed)?;

        match tolerate_existing(self.client.create_secret(&namespace, &secret).await)? {
            Outcome::Created => info!("- Created Secret {}/{}", namespace, secret.name_any()),
            Outcome::AlreadyExisted => debug!("- Secret {}/{} already exists", namespace, secret.name_any()),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "provisioner_test.rs"]
mod provisioner_test;
