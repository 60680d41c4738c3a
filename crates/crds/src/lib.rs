//! Initializer CRD Definitions
//!
//! Kubernetes Custom Resource Definitions watched by the initializer
//! controllers, plus the ordered pending-initializer list they share.

pub mod initializers;
pub mod project;
pub mod sealed_secret;

pub use initializers::*;
pub use project::*;
pub use sealed_secret::*;
