//! Completion committer.
//!
//! Removes this controller from the head of an object's pending list and
//! writes the whole object back. The write carries the resourceVersion
//! the object was read at, so a concurrent modification fails with a
//! conflict instead of being overwritten; the next cycle retries from a
//! fresh snapshot.

use crate::error::ControllerError;
use cluster_client::ClusterClient;
use crds::Initializable;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Persists "initializer done" for one controller identity.
pub struct Committer<C: ClusterClient> {
    client: Arc<C>,
    initializer_name: String,
}

impl<C: ClusterClient> Committer<C> {
    /// Creates a committer acting as `initializer_name`.
    pub fn new(client: Arc<C>, initializer_name: impl Into<String>) -> Self {
        Self {
            client,
            initializer_name: initializer_name.into(),
        }
    }

    /// Builds the updated copy of `object` with the head initializer removed.
    ///
    /// Fails when this controller is not at the head of the pending list.
    pub fn release<K: Initializable>(&self, object: &K) -> Result<K, ControllerError> {
        let Some(initializers) = object.initializers() else {
            return Err(self.not_head(object));
        };
        if initializers.head() != Some(self.initializer_name.as_str()) {
            return Err(self.not_head(object));
        }

        let mut released = object.clone();
        released.set_initializers(initializers.without_head());
        Ok(released)
    }

    /// Removes the head initializer and replaces the object in the cluster.
    pub async fn commit<K: Initializable>(&self, object: &K) -> Result<K, ControllerError> {
        let released = self.release(object)?;
        let namespace = object.namespace().unwrap_or_default();
        let name = object.name_any();

        match self.client.replace(&released).await {
            Ok(updated) => {
                match updated.initializers() {
                    None => info!(
                        "{} {}/{} fully initialized by {}",
                        K::kind(&()),
                        namespace,
                        name,
                        self.initializer_name
                    ),
                    Some(rest) => info!(
                        "{} {}/{} released by {}, still pending: {:?}",
                        K::kind(&()),
                        namespace,
                        name,
                        self.initializer_name,
                        rest.names()
                    ),
                }
                Ok(updated)
            }
            Err(e) => {
                debug!(
                    "Failed to commit {} {}/{} for {}: {}",
                    K::kind(&()),
                    namespace,
                    name,
                    self.initializer_name,
                    e
                );
                Err(e.into())
            }
        }
    }

    fn not_head<K: Initializable>(&self, object: &K) -> ControllerError {
        ControllerError::NotPendingHead {
            initializer: self.initializer_name.clone(),
            object: format!("{}/{}", object.namespace().unwrap_or_default(), object.name_any()),
        }
    }
}
