//! SealedSecret Initializer
//!
//! Unseals `SealedSecret` resources: when this controller is the head of an
//! object's pending-initializer list it creates a `Secret` of the same name
//! and namespace holding the object's data, owned by the SealedSecret so it
//! is garbage-collected with it.

mod provisioner;

use cluster_client::KubeClusterClient;
use initializer::{Controller, InitializerConfig};
use kube::Client;
use provisioner::SealedSecretProvisioner;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_INITIALIZER_NAME: &str = "sealedsecret.initializer.kubernetes.io";
const DEFAULT_ANNOTATION: &str = "initializer.kubernetes.io/sealedsecrets";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting SealedSecret Initializer");

    let config = InitializerConfig::from_env(DEFAULT_INITIALIZER_NAME, DEFAULT_ANNOTATION)?;

    info!("Configuration:");
    info!("  Initializer name: {}", config.initializer_name);
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Reconcile interval: {:?}", config.reconcile_interval);
    info!("  API timeout: {:?}", config.api_timeout);

    let kube_client = Client::try_default().await?;
    let cluster = Arc::new(KubeClusterClient::new(kube_client.clone(), config.api_timeout));
    let provisioner = SealedSecretProvisioner::new(cluster.clone(), config.initializer_name.clone());

    let controller = Controller::start(kube_client, cluster, config, provisioner).await?;
    controller.run().await?;

    Ok(())
}
