//! Initializer controller core
//!
//! Shared machinery for controllers that finish the initialization of a
//! custom resource:
//! - [`cache`]: list+watch mirror of the watched collection
//! - [`reconciler`]: fixed-interval loop selecting objects whose pending
//!   initializer head is this controller
//! - [`provisioner`]: the per-kind side effects (implemented by each binary)
//! - [`committer`]: removes this controller from the pending list
//! - [`controller`]: wiring, startup validation and shutdown

pub mod cache;
pub mod committer;
pub mod config;
pub mod controller;
pub mod error;
pub mod provisioner;
pub mod reconciler;

pub use cache::{ResourceCache, WatchDriver};
pub use committer::Committer;
pub use config::InitializerConfig;
pub use controller::Controller;
pub use error::ControllerError;
pub use provisioner::{MANAGED_BY_LABEL, Outcome, Provisioner, managed_by_labels, tolerate_existing};
pub use reconciler::{CycleReport, Reconciler};
