//! Project CRD
//!
//! A tenant project. Initializing it provisions one namespace per
//! environment and grants the owner a role binding in each.

use crate::initializers::{Initializable, Initializers};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "harbur.io",
    version = "v1alpha1",
    kind = "Project",
    plural = "projects",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    /// User granted access to the project namespaces
    pub owner: String,

    /// Desired replica count (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Initializers that still have to run, highest priority first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializers: Option<Initializers>,
}

impl Initializable for Project {
    fn initializers(&self) -> Option<&Initializers> {
        self.spec.initializers.as_ref()
    }

    fn set_initializers(&mut self, initializers: Option<Initializers>) {
        self.spec.initializers = initializers;
    }
}
