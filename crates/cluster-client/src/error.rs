//! Cluster client errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Create rejected because the object is already present
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: String, name: String },

    /// Update rejected because the object changed since it was read
    #[error("Conflict updating {kind} {name}: {message}")]
    Conflict {
        kind: String,
        name: String,
        message: String,
    },

    /// Object does not exist
    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },

    /// Call exceeded its deadline
    #[error("{operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    /// API server returned any other failure status
    #[error("Kubernetes API error ({code}): {message}")]
    Api { code: u16, message: String },

    /// Transport, TLS or serialization failure inside the kube client
    #[error("Kubernetes client error: {0}")]
    Kube(#[from] kube::Error),
}

impl ClusterError {
    /// Classifies a kube error for the object identified by `kind`/`name`.
    pub fn from_kube(err: kube::Error, kind: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(response) => match (response.code, response.reason.as_str()) {
                (409, "AlreadyExists") => ClusterError::AlreadyExists {
                    kind: kind.to_string(),
                    name: name.to_string(),
                },
                (409, _) => ClusterError::Conflict {
                    kind: kind.to_string(),
                    name: name.to_string(),
                    message: response.message.clone(),
                },
                (404, _) => ClusterError::NotFound {
                    kind: kind.to_string(),
                    name: name.to_string(),
                },
                (code, _) => ClusterError::Api {
                    code,
                    message: response.message.clone(),
                },
            },
            other => ClusterError::Kube(other),
        }
    }

    /// True when a create found the object already present
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClusterError::AlreadyExists { .. })
    }

    /// True when an update lost an optimistic-concurrency race
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClusterError::Conflict { .. })
    }
}
