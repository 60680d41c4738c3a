//! Controller-specific error types.
//!
//! This module defines error types for the initializer controllers that
//! are not covered by upstream library errors.

use cluster_client::ClusterError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in an initializer controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error outside the cluster client (startup, watch)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Cluster write failed
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Object lacks metadata needed to act on it
    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    /// One or more dependent resources could not be created
    #[error("Provisioning failed for {object}: {details}")]
    Provisioning { object: String, details: String },

    /// Commit attempted by an initializer that is not at the head of the list
    #[error("{initializer} is not the pending head of {object}")]
    NotPendingHead { initializer: String, object: String },

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
