//! Main controller implementation.
//!
//! This module contains the `Controller` struct that validates cluster
//! access, starts the watch driver and the reconciliation loop as
//! background tasks, and stops both on shutdown.

use crate::cache;
use crate::config::InitializerConfig;
use crate::error::ControllerError;
use crate::provisioner::Provisioner;
use crate::reconciler::Reconciler;
use cluster_client::ClusterClient;
use kube::api::ListParams;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A running initializer controller.
pub struct Controller {
    watch_driver: JoinHandle<Result<(), ControllerError>>,
    reconcile_loop: JoinHandle<Result<(), ControllerError>>,
    shutdown: CancellationToken,
}

impl Controller {
    /// Validates cluster access and starts the background tasks.
    ///
    /// Fails immediately when the API server is unreachable or the watched
    /// resource type is not registered.
    pub async fn start<P, C>(
        kube_client: Client,
        cluster: Arc<C>,
        config: InitializerConfig,
        provisioner: P,
    ) -> Result<Self, ControllerError>
    where
        P: Provisioner + 'static,
        C: ClusterClient + 'static,
    {
        let kind = <P::Resource as kube::Resource>::kind(&()).to_string();
        info!("Initializing {} initializer {}", kind, config.initializer_name);

        // Validate connectivity before proceeding
        let version = kube_client.apiserver_version().await.map_err(|e| {
            error!("Failed to reach the Kubernetes API server: {}", e);
            ControllerError::Kube(e)
        })?;
        info!("Connected to Kubernetes {}.{}", version.major, version.minor);

        let api: Api<P::Resource> = match config.namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client, ns),
            None => Api::all(kube_client),
        };
        api.list(&ListParams::default().limit(1)).await.map_err(|e| {
            error!("Cannot list {} resources, is the CRD installed? {}", kind, e);
            ControllerError::Kube(e)
        })?;

        let shutdown = CancellationToken::new();
        let (cache, watch_driver) = cache::start(api, shutdown.clone());

        let config = Arc::new(config);
        let reconciler = Reconciler::new(config, cache, provisioner, cluster);
        let reconcile_loop = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { reconciler.run(shutdown).await })
        };

        Ok(Self {
            watch_driver,
            reconcile_loop,
            shutdown,
        })
    }

    /// Runs the controller until a shutdown signal or a task failure.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Initializer controller running");

        let outcome = tokio::select! {
            _ = shutdown_signal() => {
                info!("Shutdown signal received");
                Ok(())
            }
            _ = self.shutdown.cancelled() => Ok(()),
            result = &mut self.watch_driver => {
                result
                    .map_err(|e| ControllerError::Watch(format!("watch driver panicked: {}", e)))
                    .and_then(|r| r)
            }
            result = &mut self.reconcile_loop => {
                result
                    .map_err(|e| ControllerError::Watch(format!("reconciliation loop panicked: {}", e)))
                    .and_then(|r| r)
            }
        };

        self.shutdown.cancel();
        for handle in [self.watch_driver, self.reconcile_loop] {
            if !handle.is_finished() {
                let _ = handle.await;
            }
        }

        info!("Initializer controller stopped");
        outcome
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
