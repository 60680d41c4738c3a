//! Pending initializers
//!
//! An ordered queue of controller identities that must each finish
//! initializing an object before it is considered usable. Only the head of
//! the queue may act on the object; when the last entry is removed the
//! whole list is dropped and the object is fully initialized.

use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Ordered list of initializers still pending on an object.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Initializers {
    /// Pending initializers, highest priority first
    #[serde(default)]
    pub pending: Vec<Initializer>,
}

/// A single pending initializer entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Initializer {
    /// Identity of the controller responsible for this step
    pub name: String,
}

impl Initializers {
    /// Builds a pending list from initializer names, keeping their order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pending: names
                .into_iter()
                .map(|name| Initializer { name: name.into() })
                .collect(),
        }
    }

    /// Name of the initializer allowed to act next.
    ///
    /// An empty pending list has no head.
    pub fn head(&self) -> Option<&str> {
        self.pending.first().map(|i| i.name.as_str())
    }

    /// Returns a new list with the head removed.
    ///
    /// Remaining entries keep their relative order. Returns `None` when
    /// nothing is left, which marks the object as fully initialized.
    #[must_use]
    pub fn without_head(&self) -> Option<Initializers> {
        let rest: Vec<Initializer> = self.pending.iter().skip(1).cloned().collect();
        if rest.is_empty() {
            None
        } else {
            Some(Initializers { pending: rest })
        }
    }

    /// Pending initializer names in order.
    pub fn names(&self) -> Vec<&str> {
        self.pending.iter().map(|i| i.name.as_str()).collect()
    }
}

/// A namespaced custom resource that carries a pending-initializer list.
pub trait Initializable:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Current pending list, `None` once fully initialized
    fn initializers(&self) -> Option<&Initializers>;

    /// Replaces the pending list wholesale
    fn set_initializers(&mut self, initializers: Option<Initializers>);

    /// Name at the head of the pending list, if any
    fn pending_head(&self) -> Option<&str> {
        self.initializers().and_then(Initializers::head)
    }
}
