//! Project provisioning.
//!
//! A project `{namespace}/{name}` owns one namespace per configured
//! environment, `{namespace}-{name}-{environment}`. Inside each of them the
//! project owner is bound to a cluster role through `{owner}-cluster-admin`.
//! Environments are handled independently: one failing does not stop the
//! rest, and the failures are reported together once every environment has
//! been attempted.

use async_trait::async_trait;
use cluster_client::{ClusterClient, ClusterError};
use crds::Project;
use initializer::{ControllerError, Outcome, Provisioner, managed_by_labels, tolerate_existing};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use kube::ResourceExt;
use kube::api::ObjectMeta;
use std::env;
use std::sync::Arc;
use tracing::{debug, info, warn};

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Environments provisioned for every project unless overridden
pub const DEFAULT_ENVIRONMENTS: [&str; 4] = ["lab", "staging", "pre", "pro"];

/// Cluster role granted to the project owner unless overridden
pub const DEFAULT_CLUSTER_ROLE: &str = "silk:users:cluster-admin";

/// Project-specific settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    /// Namespace suffixes, one namespace per entry
    pub environments: Vec<String>,

    /// ClusterRole referenced by the owner's role bindings
    pub cluster_role: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            environments: DEFAULT_ENVIRONMENTS.iter().map(|s| s.to_string()).collect(),
            cluster_role: DEFAULT_CLUSTER_ROLE.to_string(),
        }
    }
}

impl ProjectSettings {
    /// Reads `PROJECT_ENVIRONMENTS` (comma separated) and `PROJECT_CLUSTER_ROLE`.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_values(
            env::var("PROJECT_ENVIRONMENTS").ok(),
            env::var("PROJECT_CLUSTER_ROLE").ok(),
        )
    }

    fn from_values(
        environments: Option<String>,
        cluster_role: Option<String>,
    ) -> Result<Self, ControllerError> {
        let mut settings = Self::default();

        if let Some(value) = environments {
            let parsed: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if parsed.is_empty() {
                return Err(ControllerError::InvalidConfig(
                    "PROJECT_ENVIRONMENTS must list at least one environment".to_string(),
                ));
            }
            settings.environments = parsed;
        }

        if let Some(role) = cluster_role.filter(|r| !r.trim().is_empty()) {
            settings.cluster_role = role.trim().to_string();
        }

        Ok(settings)
    }
}

/// Creates the environment namespaces and owner bindings of a project.
pub struct ProjectProvisioner<C: ClusterClient> {
    client: Arc<C>,
    initializer_name: String,
    settings: ProjectSettings,
}

impl<C: ClusterClient> ProjectProvisioner<C> {
    /// Creates a provisioner labelling its resources with `initializer_name`.
    pub fn new(client: Arc<C>, initializer_name: impl Into<String>, settings: ProjectSettings) -> Self {
        Self {
            client,
            initializer_name: initializer_name.into(),
            settings,
        }
    }

    /// Name of the namespace backing `environment` of `project`.
    pub fn namespace_name(project: &Project, environment: &str) -> String {
        format!(
            "{}-{}-{}",
            project.namespace().unwrap_or_default(),
            project.name_any(),
            environment
        )
    }

    fn namespace_spec(&self, name: &str) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(managed_by_labels(&self.initializer_name)),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn role_binding_spec(&self, namespace: &str, owner: &str) -> RoleBinding {
        RoleBinding {
            metadata: ObjectMeta {
                name: Some(format!("{}-cluster-admin", owner)),
                namespace: Some(namespace.to_string()),
                labels: Some(managed_by_labels(&self.initializer_name)),
                ..Default::default()
            },
            role_ref: RoleRef {
                api_group: RBAC_API_GROUP.to_string(),
                kind: "ClusterRole".to_string(),
                name: self.settings.cluster_role.clone(),
            },
            subjects: Some(vec![Subject {
                api_group: Some(RBAC_API_GROUP.to_string()),
                kind: "User".to_string(),
                name: owner.to_string(),
                namespace: None,
            }]),
        }
    }

    async fn provision_environment(&self, project: &Project, environment: &str) -> Result<(), ClusterError> {
        let namespace = Self::namespace_name(project, environment);

        match tolerate_existing(self.client.create_namespace(&self.namespace_spec(&namespace)).await)? {
            Outcome::Created => info!("- Created Namespace {}", namespace),
            Outcome::AlreadyExisted => debug!("- Namespace {} already exists", namespace),
        }

        // Only attempted once the namespace is known to exist
        let binding = self.role_binding_spec(&namespace, &project.spec.owner);
        match tolerate_existing(self.client.create_role_binding(&namespace, &binding).await)? {
            Outcome::Created => info!("- Created RoleBinding {}/{}", namespace, binding.name_any()),
            Outcome::AlreadyExisted => {
                debug!("- RoleBinding {}/{} already exists", namespace, binding.name_any())
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<C: ClusterClient> Provisioner for ProjectProvisioner<C> {
    type Resource = Project;

    async fn provision(&self, project: &Project) -> Result<(), ControllerError> {
        let object = format!("{}/{}", project.namespace().unwrap_or_default(), project.name_any());
        if project.namespace().is_none() {
            return Err(ControllerError::MissingMetadata(format!(
                "Project {} has no namespace",
                object
            )));
        }
        if project.spec.owner.trim().is_empty() {
            return Err(ControllerError::Provisioning {
                object,
                details: "spec.owner is empty".to_string(),
            });
        }

        let mut failures = Vec::new();
        for environment in &self.settings.environments {
            if let Err(e) = self.provision_environment(project, environment).await {
                warn!("Environment {} of Project {} failed: {}", environment, object, e);
                failures.push(format!("{}: {}", environment, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::Provisioning {
                object,
                details: failures.join("; "),
            })
        }
    }
}
