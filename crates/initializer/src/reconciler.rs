//! Reconciliation loop.
//!
//! Every `reconcile_interval` the loop snapshots the cache and, for each
//! object whose pending-initializer head is this controller, provisions
//! the dependent resources and then commits. Objects are handled one at a
//! time; a failure is logged and contained to its object, which stays
//! pending and is picked up again next cycle. There is no other retry.

use crate::cache::ResourceCache;
use crate::committer::Committer;
use crate::config::InitializerConfig;
use crate::error::ControllerError;
use crate::provisioner::Provisioner;
use cluster_client::ClusterClient;
use crds::Initializable;
use kube::ResourceExt;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Counts for one pass over the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Provisioned and committed
    pub initialized: usize,
    /// Committed without provisioning (annotation opt-in not given)
    pub released: usize,
    /// Pending on another initializer first
    pub skipped: usize,
    /// Provision or commit failed; retried next cycle
    pub failed: usize,
}

enum Disposition {
    Initialized,
    Released,
}

/// Drives provision-then-commit for one controller identity.
pub struct Reconciler<P: Provisioner, C: ClusterClient> {
    config: Arc<InitializerConfig>,
    cache: ResourceCache<P::Resource>,
    provisioner: P,
    committer: Committer<C>,
}

impl<P: Provisioner, C: ClusterClient> Reconciler<P, C> {
    /// Creates a reconciler over `cache` writing through `client`.
    pub fn new(
        config: Arc<InitializerConfig>,
        cache: ResourceCache<P::Resource>,
        provisioner: P,
        client: Arc<C>,
    ) -> Self {
        let committer = Committer::new(client, config.initializer_name.clone());
        Self {
            config,
            cache,
            provisioner,
            committer,
        }
    }

    /// True when this controller is at the head of the object's pending list.
    pub fn is_selected(&self, object: &P::Resource) -> bool {
        object.pending_head() == Some(self.config.initializer_name.as_str())
    }

    /// Runs one pass over the current cache snapshot.
    pub async fn reconcile_once(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for object in self.cache.snapshot() {
            if object.initializers().is_none() {
                continue;
            }
            if !self.is_selected(&object) {
                debug!(
                    "Skipping {}/{}: waiting on {:?}",
                    object.namespace().unwrap_or_default(),
                    object.name_any(),
                    object.pending_head()
                );
                report.skipped += 1;
                continue;
            }

            match self.initialize(&object).await {
                Ok(Disposition::Initialized) => report.initialized += 1,
                Ok(Disposition::Released) => report.released += 1,
                Err(e) => {
                    error!(
                        "Failed to initialize {}/{} as {}: {}",
                        object.namespace().unwrap_or_default(),
                        object.name_any(),
                        self.config.initializer_name,
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    async fn initialize(&self, object: &P::Resource) -> Result<Disposition, ControllerError> {
        let namespace = object.namespace().unwrap_or_default();
        let name = object.name_any();

        if self.config.require_annotation && !self.has_opt_in(object) {
            info!(
                "Releasing {}/{} without provisioning: annotation {} not set",
                namespace, name, self.config.annotation
            );
            self.committer.commit(object).await?;
            return Ok(Disposition::Released);
        }

        info!("Initializing {} {}/{}", <P::Resource as kube::Resource>::kind(&()), namespace, name);
        self.provisioner.provision(object).await?;
        self.committer.commit(object).await?;
        Ok(Disposition::Initialized)
    }

    fn has_opt_in(&self, object: &P::Resource) -> bool {
        object
            .annotations()
            .get(&self.config.annotation)
            .is_some_and(|value| value == "true")
    }

    /// Runs cycles until `shutdown` is cancelled.
    ///
    /// Waits for the cache's initial list before the first cycle.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), ControllerError> {
        info!(
            "Reconciliation loop for {} starting (interval {:?})",
            self.config.initializer_name, self.config.reconcile_interval
        );

        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            ready = self.cache.wait_until_ready() => ready?,
        }

        let mut ticker = tokio::time::interval(self.config.reconcile_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Reconciliation loop for {} stopped", self.config.initializer_name);
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let report = self.reconcile_once().await;
                    debug!("Cycle complete: {:?}", report);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod reconciler_test;
