//! Project Initializer
//!
//! Finishes the initialization of `Project` resources: for every project
//! whose pending-initializer head is this controller it creates one
//! namespace per environment (`{namespace}-{name}-{environment}`), binds the
//! project owner to a cluster role inside each, and then removes itself
//! from the project's pending list.

mod provisioner;
#[cfg(test)]
mod scenario_test;

use cluster_client::KubeClusterClient;
use initializer::{Controller, InitializerConfig};
use kube::Client;
use provisioner::{ProjectProvisioner, ProjectSettings};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_INITIALIZER_NAME: &str = "project.initializer.kubernetes.io";
const DEFAULT_ANNOTATION: &str = "initializer.kubernetes.io/projects";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Project Initializer");

    // Load configuration from environment variables
    let config = InitializerConfig::from_env(DEFAULT_INITIALIZER_NAME, DEFAULT_ANNOTATION)?;
    let settings = ProjectSettings::from_env()?;

    info!("Configuration:");
    info!("  Initializer name: {}", config.initializer_name);
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Reconcile interval: {:?}", config.reconcile_interval);
    info!("  Environments: {}", settings.environments.join(", "));
    info!("  Cluster role: {}", settings.cluster_role);
    if config.require_annotation {
        info!("  Requires annotation: {}=true", config.annotation);
    }

    // Initialize and run controller
    let kube_client = Client::try_default().await?;
    let cluster = Arc::new(KubeClusterClient::new(kube_client.clone(), config.api_timeout));
    let provisioner = ProjectProvisioner::new(cluster.clone(), config.initializer_name.clone(), settings);

    let controller = Controller::start(kube_client, cluster, config, provisioner).await?;
    controller.run().await?;

    Ok(())
}
