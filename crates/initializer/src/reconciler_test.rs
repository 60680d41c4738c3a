//! Unit tests for the reconciliation loop

use super::*;
use cluster_client::MockClusterClient;
use crds::{Initializers, Project, ProjectSpec};
use kube_runtime::reflector::{self, store::Writer};
use kube_runtime::watcher;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

const NAME: &str = "project.initializer.kubernetes.io";
const ANNOTATION: &str = "initializer.kubernetes.io/projects";

/// Records which objects were provisioned and fails on request
#[derive(Clone, Default)]
struct RecordingProvisioner {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingProvisioner {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn fail_for(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    fn recover(&self, name: &str) {
        self.failing.lock().unwrap().remove(name);
    }
}

#[async_trait::async_trait]
impl Provisioner for RecordingProvisioner {
    type Resource = Project;

    async fn provision(&self, object: &Project) -> Result<(), ControllerError> {
        let name = object.name_any();
        self.calls.lock().unwrap().push(name.clone());
        if self.failing.lock().unwrap().contains(&name) {
            return Err(ControllerError::Provisioning {
                object: name,
                details: "injected".to_string(),
            });
        }
        Ok(())
    }
}

struct Harness {
    mock: Arc<MockClusterClient>,
    writer: Writer<Project>,
    provisioner: RecordingProvisioner,
    reconciler: Reconciler<RecordingProvisioner, MockClusterClient>,
}

impl Harness {
    fn new(config: InitializerConfig) -> Self {
        let mock = Arc::new(MockClusterClient::new());
        let (store, writer) = reflector::store::<Project>();
        let provisioner = RecordingProvisioner::default();
        let reconciler = Reconciler::new(
            Arc::new(config),
            ResourceCache::from(store),
            provisioner.clone(),
            mock.clone(),
        );
        Self {
            mock,
            writer,
            provisioner,
            reconciler,
        }
    }

    fn with_defaults() -> Self {
        Self::new(InitializerConfig::new(NAME, ANNOTATION))
    }

    /// Creates the object in the mock cluster and delivers it to the cache
    fn create(&mut self, project: Project) -> Project {
        let stored = self.mock.seed(&project);
        self.writer.apply_watcher_event(&watcher::Event::Apply(stored.clone()));
        stored
    }

    /// Delivers the cluster's current copy of `name` to the cache
    fn sync(&mut self, name: &str) {
        let current: Project = self.mock.get(Some("default"), name).unwrap();
        self.writer.apply_watcher_event(&watcher::Event::Apply(current));
    }

    fn stored(&self, name: &str) -> Project {
        self.mock.get(Some("default"), name).unwrap()
    }
}

fn project(name: &str, pending: Option<&[&str]>) -> Project {
    let mut project = Project::new(
        name,
        ProjectSpec {
            owner: "alice".to_string(),
            replicas: None,
            initializers: pending.map(|names| Initializers::new(names.iter().copied())),
        },
    );
    project.metadata.namespace = Some("default".to_string());
    project
}

#[tokio::test]
async fn test_head_match_is_provisioned_and_committed() {
    let mut h = Harness::with_defaults();
    h.create(project("acme", Some(&[NAME])));

    let report = h.reconciler.reconcile_once().await;

    assert_eq!(report.initialized, 1);
    assert_eq!(h.provisioner.calls(), vec!["acme".to_string()]);
    assert_eq!(h.stored("acme").initializers(), None);
}

#[tokio::test]
async fn test_other_head_is_never_provisioned() {
    let mut h = Harness::with_defaults();
    h.create(project("acme", Some(&["other.initializer.io", NAME])));

    let report = h.reconciler.reconcile_once().await;

    assert_eq!(report.skipped, 1);
    assert!(h.provisioner.calls().is_empty());
    assert_eq!(h.mock.replace_calls("Project"), 0);
    assert_eq!(
        h.stored("acme").initializers().unwrap().names(),
        vec!["other.initializer.io", NAME]
    );
}

#[tokio::test]
async fn test_initialized_objects_are_untouched() {
    let mut h = Harness::with_defaults();
    h.create(project("done", None));

    let report = h.reconciler.reconcile_once().await;

    assert_eq!(report, CycleReport::default());
    assert!(h.provisioner.calls().is_empty());
}

#[tokio::test]
async fn test_failed_provision_skips_commit() {
    let mut h = Harness::with_defaults();
    h.create(project("acme", Some(&[NAME, "next.initializer.io"])));
    h.provisioner.fail_for("acme");

    let report = h.reconciler.reconcile_once().await;

    assert_eq!(report.failed, 1);
    assert_eq!(h.mock.replace_calls("Project"), 0);
    assert_eq!(
        h.stored("acme").initializers().unwrap().names(),
        vec![NAME, "next.initializer.io"]
    );
}

#[tokio::test]
async fn test_one_failure_does_not_abort_the_cycle() {
    let mut h = Harness::with_defaults();
    h.create(project("acme", Some(&[NAME])));
    h.create(project("globex", Some(&[NAME])));
    h.provisioner.fail_for("acme");

    let report = h.reconciler.reconcile_once().await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.initialized, 1);
    assert_eq!(h.stored("globex").initializers(), None);
    assert_eq!(h.stored("acme").pending_head(), Some(NAME));
}

#[tokio::test]
async fn test_failed_object_is_retried_next_cycle() {
    let mut h = Harness::with_defaults();
    h.create(project("acme", Some(&[NAME])));
    h.provisioner.fail_for("acme");

    assert_eq!(h.reconciler.reconcile_once().await.failed, 1);

    h.provisioner.recover("acme");
    let report = h.reconciler.reconcile_once().await;

    assert_eq!(report.initialized, 1);
    assert_eq!(h.provisioner.calls().len(), 2);
    assert_eq!(h.stored("acme").initializers(), None);
}

#[tokio::test]
async fn test_stale_cache_entry_reprovisions_without_double_commit() {
    let mut h = Harness::with_defaults();
    h.create(project("acme", Some(&[NAME])));

    assert_eq!(h.reconciler.reconcile_once().await.initialized, 1);

    // The watch has not delivered our own write yet: the cache still shows
    // the pre-commit object. Provision runs again, the stale commit conflicts.
    let report = h.reconciler.reconcile_once().await;
    assert_eq!(report.failed, 1);
    assert_eq!(h.provisioner.calls().len(), 2);
    assert_eq!(h.stored("acme").initializers(), None);

    // Once the watch catches up the object is left alone
    h.sync("acme");
    let report = h.reconciler.reconcile_once().await;
    assert_eq!(report, CycleReport::default());
    assert_eq!(h.provisioner.calls().len(), 2);
}

#[tokio::test]
async fn test_conflicting_commit_retries_from_fresh_snapshot() {
    let mut h = Harness::with_defaults();
    h.create(project("acme", Some(&[NAME])));
    // Someone else updated the object after the cache saw it
    h.mock.touch::<Project>(Some("default"), "acme");

    let report = h.reconciler.reconcile_once().await;
    assert_eq!(report.failed, 1);
    assert_eq!(h.stored("acme").pending_head(), Some(NAME));

    h.sync("acme");
    let report = h.reconciler.reconcile_once().await;
    assert_eq!(report.initialized, 1);
    assert_eq!(h.stored("acme").initializers(), None);
}

#[tokio::test]
async fn test_commit_keeps_remaining_initializers_in_order() {
    let mut h = Harness::with_defaults();
    h.create(project("acme", Some(&[NAME, "b.io", "c.io"])));

    h.reconciler.reconcile_once().await;

    assert_eq!(
        h.stored("acme").initializers().unwrap().names(),
        vec!["b.io", "c.io"]
    );
}

#[tokio::test]
async fn test_required_annotation_missing_releases_without_provisioning() {
    let mut config = InitializerConfig::new(NAME, ANNOTATION);
    config.require_annotation = true;
    let mut h = Harness::new(config);
    h.create(project("acme", Some(&[NAME])));

    let report = h.reconciler.reconcile_once().await;

    assert_eq!(report.released, 1);
    assert!(h.provisioner.calls().is_empty());
    assert_eq!(h.stored("acme").initializers(), None);
}

#[tokio::test]
async fn test_required_annotation_present_provisions() {
    let mut config = InitializerConfig::new(NAME, ANNOTATION);
    config.require_annotation = true;
    let mut h = Harness::new(config);
    let mut annotated = project("acme", Some(&[NAME]));
    annotated
        .metadata
        .annotations
        .get_or_insert_with(Default::default)
        .insert(ANNOTATION.to_string(), "true".to_string());
    h.create(annotated);

    let report = h.reconciler.reconcile_once().await;

    assert_eq!(report.initialized, 1);
    assert_eq!(h.provisioner.calls(), vec!["acme".to_string()]);
}

#[tokio::test]
async fn test_run_stops_on_cancellation() {
    let mut config = InitializerConfig::new(NAME, ANNOTATION);
    config.reconcile_interval = Duration::from_millis(10);
    let mut h = Harness::new(config);
    h.writer.apply_watcher_event(&watcher::Event::Init);
    h.writer.apply_watcher_event(&watcher::Event::InitApply(h.mock.seed(&project("acme", Some(&[NAME])))));
    h.writer.apply_watcher_event(&watcher::Event::InitDone);

    let shutdown = CancellationToken::new();
    let reconciler = Arc::new(h.reconciler);
    let task = {
        let reconciler = reconciler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { reconciler.run(shutdown).await })
    };

    // First tick fires immediately
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.provisioner.calls().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    shutdown.cancel();
    task.await.unwrap().unwrap();
    let stored: Project = h.mock.get(Some("default"), "acme").unwrap();
    assert_eq!(stored.initializers(), None);
}
