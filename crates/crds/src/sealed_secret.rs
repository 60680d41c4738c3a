//! SealedSecret CRD
//!
//! Carries secret data that is unsealed into a plain `Secret` of the same
//! name when the object is initialized.

use crate::initializers::{Initializable, Initializers};
use k8s_openapi::ByteString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "harbur.io",
    version = "v1alpha1",
    kind = "SealedSecret",
    plural = "sealedsecrets",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct SealedSecretSpec {
    /// Secret payload, base64 encoded on the wire
    #[serde(default)]
    #[schemars(with = "BTreeMap<String, String>")]
    pub data: BTreeMap<String, ByteString>,

    /// Owning user (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Desired replica count (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Initializers that still have to run, highest priority first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializers: Option<Initializers>,
}

impl Initializable for SealedSecret {
    fn initializers(&self) -> Option<&Initializers> {
        self.spec.initializers.as_ref()
    }

    fn set_initializers(&mut self, initializers: Option<Initializers>) {
        self.spec.initializers = initializers;
    }
}
