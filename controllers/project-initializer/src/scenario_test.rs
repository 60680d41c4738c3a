//! Reconciliation scenarios for projects against the in-memory cluster

use crate::provisioner::{ProjectProvisioner, ProjectSettings};
use cluster_client::MockClusterClient;
use crds::{Initializable, Initializers, Project, ProjectSpec};
use initializer::{InitializerConfig, MANAGED_BY_LABEL, Reconciler, ResourceCache};
use kube_runtime::reflector::{self, store::Writer};
use kube_runtime::watcher;
use std::sync::Arc;

const NAME: &str = "project.initializer.kubernetes.io";
const ANNOTATION: &str = "initializer.kubernetes.io/projects";

struct Scenario {
    mock: Arc<MockClusterClient>,
    writer: Writer<Project>,
    reconciler: Reconciler<ProjectProvisioner<MockClusterClient>, MockClusterClient>,
}

impl Scenario {
    fn new() -> Self {
        let mock = Arc::new(MockClusterClient::new());
        let (store, writer) = reflector::store::<Project>();
        let provisioner = ProjectProvisioner::new(mock.clone(), NAME, ProjectSettings::default());
        let reconciler = Reconciler::new(
            Arc::new(InitializerConfig::new(NAME, ANNOTATION)),
            ResourceCache::from(store),
            provisioner,
            mock.clone(),
        );
        Self {
            mock,
            writer,
            reconciler,
        }
    }

    fn create(&mut self, name: &str, owner: &str) {
        let mut project = Project::new(
            name,
            ProjectSpec {
                owner: owner.to_string(),
                replicas: Some(1),
                initializers: Some(Initializers::new([NAME])),
            },
        );
        project.metadata.namespace = Some("default".to_string());
        let stored = self.mock.seed(&project);
        self.writer.apply_watcher_event(&watcher::Event::Apply(stored));
    }

    fn sync(&mut self, name: &str) {
        let current = self.stored(name);
        self.writer.apply_watcher_event(&watcher::Event::Apply(current));
    }

    fn stored(&self, name: &str) -> Project {
        self.mock.get(Some("default"), name).unwrap()
    }
}

const ENVIRONMENT_NAMESPACES: [&str; 4] = [
    "default-acme-lab",
    "default-acme-pre",
    "default-acme-pro",
    "default-acme-staging",
];

#[tokio::test]
async fn test_project_gets_namespaces_and_owner_bindings() {
    let mut s = Scenario::new();
    s.create("acme", "alice");

    let report = s.reconciler.reconcile_once().await;

    assert_eq!(report.initialized, 1);
    assert_eq!(s.mock.namespaces(), ENVIRONMENT_NAMESPACES);
    for namespace in ENVIRONMENT_NAMESPACES {
        let bindings = s.mock.role_bindings(namespace);
        assert_eq!(bindings.len(), 1, "binding missing in {}", namespace);
        let binding = &bindings[0];
        assert_eq!(binding.metadata.name.as_deref(), Some("alice-cluster-admin"));
        assert_eq!(binding.role_ref.name, "silk:users:cluster-admin");
        assert_eq!(binding.subjects.as_ref().unwrap()[0].name, "alice");
    }
    assert_eq!(s.stored("acme").initializers(), None);
}

#[tokio::test]
async fn test_namespaces_carry_managed_by_label() {
    let mut s = Scenario::new();
    s.create("acme", "alice");

    s.reconciler.reconcile_once().await;

    let namespace: k8s_openapi::api::core::v1::Namespace =
        s.mock.get(None, "default-acme-lab").unwrap();
    assert_eq!(
        namespace.metadata.labels.unwrap().get(MANAGED_BY_LABEL).map(String::as_str),
        Some(NAME)
    );
}

#[tokio::test]
async fn test_reprovisioning_a_project_is_harmless() {
    let mut s = Scenario::new();
    s.create("acme", "alice");

    assert_eq!(s.reconciler.reconcile_once().await.initialized, 1);
    // Cache not yet updated: the project is provisioned a second time
    s.reconciler.reconcile_once().await;

    assert_eq!(s.mock.create_calls("Namespace"), 8);
    assert_eq!(s.mock.namespaces(), ENVIRONMENT_NAMESPACES);
    for namespace in ENVIRONMENT_NAMESPACES {
        assert_eq!(s.mock.role_bindings(namespace).len(), 1);
    }
    assert_eq!(s.stored("acme").initializers(), None);
}

#[tokio::test]
async fn test_partial_failure_recovers_next_cycle() {
    let mut s = Scenario::new();
    s.create("acme", "alice");
    s.mock.fail_create("Namespace", "default-acme-pre", 1);

    let report = s.reconciler.reconcile_once().await;
    assert_eq!(report.failed, 1);
    assert_eq!(s.mock.replace_calls("Project"), 0);
    assert_eq!(s.stored("acme").pending_head(), Some(NAME));
    assert_eq!(
        s.mock.namespaces(),
        vec!["default-acme-lab", "default-acme-pro", "default-acme-staging"]
    );

    let report = s.reconciler.reconcile_once().await;
    assert_eq!(report.initialized, 1);
    assert_eq!(s.mock.namespaces(), ENVIRONMENT_NAMESPACES);
    assert_eq!(s.mock.role_bindings("default-acme-pre").len(), 1);
    assert_eq!(s.stored("acme").initializers(), None);

    s.sync("acme");
    assert_eq!(s.reconciler.reconcile_once().await.initialized, 0);
}
