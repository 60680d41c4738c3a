//! Cluster API Client
//!
//! The slice of the Kubernetes API the initializer controllers write to:
//! creating dependent namespaces, role bindings and secrets, and replacing
//! watched custom resources under optimistic concurrency.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClient, KubeClusterClient};
//! use k8s_openapi::api::core::v1::Namespace;
//! use kube::api::ObjectMeta;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let cluster = KubeClusterClient::new(client, Duration::from_secs(30));
//!
//! let namespace = Namespace {
//!     metadata: ObjectMeta {
//!         name: Some("default-acme-lab".to_string()),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! match cluster.create_namespace(&namespace).await {
//!     Ok(_) => println!("created"),
//!     Err(e) if e.is_already_exists() => println!("already there"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClient;
pub use error::ClusterError;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockClusterClient;
