//! Mock ClusterClient for unit testing
//!
//! Stores objects in memory keyed by (kind, namespace, name) and mimics the
//! API server behaviour the initializers depend on:
//! - duplicate creates fail with `AlreadyExists`
//! - every write bumps a cluster-wide `resourceVersion`
//! - replacing with a stale `resourceVersion` fails with `Conflict`
//!
//! Failures can be injected per object to exercise retry paths.

use crate::cluster_trait::{ClusterClient, NamespacedObject};
use crate::error::ClusterError;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type ObjectKey = (String, String, String);

/// Mock ClusterClient for testing
#[derive(Clone, Default)]
pub struct MockClusterClient {
    pub(crate) objects: Arc<Mutex<HashMap<ObjectKey, serde_json::Value>>>,
    // (kind, qualified name) -> remaining injected failures
    pub(crate) create_failures: Arc<Mutex<HashMap<(String, String), usize>>>,
    pub(crate) replace_failures: Arc<Mutex<HashMap<(String, String), usize>>>,
    // (kind, verb) -> number of calls
    pub(crate) calls: Arc<Mutex<HashMap<(String, &'static str), usize>>>,
    pub(crate) resource_version: Arc<Mutex<u64>>,
}

impl std::fmt::Debug for MockClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClusterClient")
            .field("objects", &self.objects.lock().unwrap().len())
            .finish_non_exhaustive()
    }
}

fn qualified(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}/{}", ns, name),
        None => name.to_string(),
    }
}

fn object_key<K: Resource<DynamicType = ()>>(namespace: Option<&str>, name: &str) -> ObjectKey {
    (
        K::kind(&()).to_string(),
        namespace.unwrap_or_default().to_string(),
        name.to_string(),
    )
}

impl MockClusterClient {
    /// Create an empty mock cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object as if a user had created it (for test setup).
    ///
    /// Assigns a uid when missing and a fresh `resourceVersion`, and returns
    /// the stored copy.
    pub fn seed<K>(&self, object: &K) -> K
    where
        K: Resource<DynamicType = ()> + Serialize + Clone,
    {
        let namespace = object.meta().namespace.clone();
        let mut objects = self.objects.lock().unwrap();
        self.store(&mut objects, namespace.as_deref(), object)
    }

    /// Fetch a stored object
    pub fn get<K>(&self, namespace: Option<&str>, name: &str) -> Option<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        self.objects
            .lock()
            .unwrap()
            .get(&object_key::<K>(namespace, name))
            .map(|value| serde_json::from_value(value.clone()).unwrap())
    }

    /// Simulate a concurrent writer by bumping the stored `resourceVersion`
    pub fn touch<K>(&self, namespace: Option<&str>, name: &str)
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Clone,
    {
        if let Some(object) = self.get::<K>(namespace, name) {
            let mut objects = self.objects.lock().unwrap();
            self.store(&mut objects, namespace, &object);
        }
    }

    /// Make the next `times` creates of `kind` named `name` fail.
    ///
    /// Namespaced objects are addressed as `namespace/name`.
    pub fn fail_create(&self, kind: &str, name: &str, times: usize) {
        self.create_failures
            .lock()
            .unwrap()
            .insert((kind.to_string(), name.to_string()), times);
    }

    /// Make the next `times` replaces of `kind` named `namespace/name` fail.
    pub fn fail_replace(&self, kind: &str, name: &str, times: usize) {
        self.replace_failures
            .lock()
            .unwrap()
            .insert((kind.to_string(), name.to_string()), times);
    }

    /// Number of create calls issued for `kind`, successful or not
    pub fn create_calls(&self, kind: &str) -> usize {
        self.call_count(kind, "create")
    }

    /// Number of replace calls issued for `kind`, successful or not
    pub fn replace_calls(&self, kind: &str) -> usize {
        self.call_count(kind, "replace")
    }

    /// Names of all stored namespaces, sorted
    pub fn namespaces(&self) -> Vec<String> {
        self.names_of("Namespace", None)
    }

    /// Role bindings stored in `namespace`, sorted by name
    pub fn role_bindings(&self, namespace: &str) -> Vec<RoleBinding> {
        self.names_of("RoleBinding", Some(namespace))
            .iter()
            .filter_map(|name| self.get::<RoleBinding>(Some(namespace), name))
            .collect()
    }

    /// Secret stored under `namespace/name`
    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.get::<Secret>(Some(namespace), name)
    }

    fn names_of(&self, kind: &str, namespace: Option<&str>) -> Vec<String> {
        let namespace = namespace.unwrap_or_default();
        let mut names: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(k, ns, _)| k == kind && ns == namespace)
            .map(|(_, _, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn call_count(&self, kind: &str, verb: &'static str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&(kind.to_string(), verb))
            .copied()
            .unwrap_or(0)
    }

    fn record_call(&self, kind: &str, verb: &'static str) {
        *self
            .calls
            .lock()
            .unwrap()
            .entry((kind.to_string(), verb))
            .or_insert(0) += 1;
    }

    fn take_failure(
        failures: &Mutex<HashMap<(String, String), usize>>,
        kind: &str,
        name: &str,
    ) -> bool {
        let mut failures = failures.lock().unwrap();
        match failures.get_mut(&(kind.to_string(), name.to_string())) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn next_resource_version(&self) -> String {
        let mut version = self.resource_version.lock().unwrap();
        *version += 1;
        version.to_string()
    }

    fn store<K>(
        &self,
        objects: &mut HashMap<ObjectKey, serde_json::Value>,
        namespace: Option<&str>,
        object: &K,
    ) -> K
    where
        K: Resource<DynamicType = ()> + Serialize + Clone,
    {
        let mut stored = object.clone();
        let meta = stored.meta_mut();
        meta.resource_version = Some(self.next_resource_version());
        if meta.uid.is_none() {
            meta.uid = Some(uuid::Uuid::new_v4().to_string());
        }
        if let Some(ns) = namespace {
            meta.namespace = Some(ns.to_string());
        }
        let name = meta.name.clone().unwrap_or_default();
        objects.insert(
            object_key::<K>(namespace, &name),
            serde_json::to_value(&stored).unwrap(),
        );
        stored
    }

    fn create_object<K>(&self, namespace: Option<&str>, object: &K) -> Result<K, ClusterError>
    where
        K: Resource<DynamicType = ()> + Serialize + Clone,
    {
        let kind = K::kind(&()).to_string();
        let name = object.meta().name.clone().unwrap_or_default();
        let qualified_name = qualified(namespace, &name);
        self.record_call(&kind, "create");

        if Self::take_failure(&self.create_failures, &kind, &qualified_name) {
            return Err(ClusterError::Api {
                code: 500,
                message: format!("injected failure creating {} {}", kind, qualified_name),
            });
        }

        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&object_key::<K>(namespace, &name)) {
            return Err(ClusterError::AlreadyExists {
                kind,
                name: qualified_name,
            });
        }
        Ok(self.store(&mut objects, namespace, object))
    }
}

#[async_trait::async_trait]
impl ClusterClient for MockClusterClient {
    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, ClusterError> {
        self.create_object(None, namespace)
    }

    async fn create_role_binding(
        &self,
        namespace: &str,
        binding: &RoleBinding,
    ) -> Result<RoleBinding, ClusterError> {
        self.create_object(Some(namespace), binding)
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, ClusterError> {
        self.create_object(Some(namespace), secret)
    }

    async fn replace<K: NamespacedObject>(&self, object: &K) -> Result<K, ClusterError> {
        let kind = K::kind(&()).to_string();
        let namespace = object.meta().namespace.clone();
        let name = object.meta().name.clone().unwrap_or_default();
        let qualified_name = qualified(namespace.as_deref(), &name);
        self.record_call(&kind, "replace");

        if Self::take_failure(&self.replace_failures, &kind, &qualified_name) {
            return Err(ClusterError::Api {
                code: 500,
                message: format!("injected failure replacing {} {}", kind, qualified_name),
            });
        }

        let mut objects = self.objects.lock().unwrap();
        let Some(current) = objects.get(&object_key::<K>(namespace.as_deref(), &name)) else {
            return Err(ClusterError::NotFound {
                kind,
                name: qualified_name,
            });
        };

        let current_version = current["metadata"]["resourceVersion"].as_str();
        if let Some(expected) = object.meta().resource_version.as_deref() {
            if current_version != Some(expected) {
                return Err(ClusterError::Conflict {
                    kind,
                    name: qualified_name,
                    message: format!(
                        "resourceVersion {} is stale (current {})",
                        expected,
                        current_version.unwrap_or("<none>")
                    ),
                });
            }
        }

        Ok(self.store(&mut objects, namespace.as_deref(), object))
    }
}
