//! Resource cache and watch driver.
//!
//! The watch driver lists the watched collection, then follows the watch
//! stream from the list's resourceVersion, applying every event to a
//! kube-runtime reflector store. When the stream breaks (server closes it,
//! or the resourceVersion is too old) the watcher relists after a backoff.
//!
//! [`ResourceCache`] is the read side: a cheap clone of the store that the
//! reconciler snapshots each cycle. Every event replaces or removes a whole
//! entry, so a snapshot never contains a half-applied object.

use crate::error::ControllerError;
use crds::Initializable;
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::reflector::{self, Store};
use kube_runtime::{WatchStreamExt, watcher};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Read handle on the locally mirrored collection.
pub struct ResourceCache<K: Initializable> {
    store: Store<K>,
}

impl<K: Initializable> Clone for ResourceCache<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<K: Initializable> From<Store<K>> for ResourceCache<K> {
    fn from(store: Store<K>) -> Self {
        Self { store }
    }
}

impl<K: Initializable> ResourceCache<K> {
    /// Point-in-time copy of every cached object, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<K>> {
        self.store.state()
    }

    /// Number of cached objects
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Waits until the initial list has been applied.
    pub async fn wait_until_ready(&self) -> Result<(), ControllerError> {
        self.store
            .wait_until_ready()
            .await
            .map_err(|e| ControllerError::Watch(format!("cache writer dropped: {}", e)))
    }
}

/// Keeps a [`ResourceCache`] in sync with the API server.
pub struct WatchDriver<K: Initializable> {
    api: Api<K>,
    writer: reflector::store::Writer<K>,
}

impl<K: Initializable> WatchDriver<K> {
    /// Creates a driver for `api` and the cache it will populate.
    pub fn new(api: Api<K>) -> (Self, ResourceCache<K>) {
        let (store, writer) = reflector::store();
        (Self { api, writer }, ResourceCache::from(store))
    }

    /// Drives list+watch until `shutdown` is cancelled.
    ///
    /// Watch errors are logged and retried with backoff; only an ended
    /// stream is returned as an error.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ControllerError> {
        let kind = K::kind(&()).to_string();
        info!("Starting {} watch driver", kind);

        let stream = watcher(self.api, watcher::Config::default())
            .default_backoff()
            .reflect(self.writer);
        let mut stream = std::pin::pin!(stream);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("{} watch driver stopped", kind);
                    return Ok(());
                }
                event = stream.next() => match event {
                    Some(Ok(event)) => log_event(&kind, &event),
                    Some(Err(e)) => {
                        warn!("{} watch failed, relisting after backoff: {}", kind, e);
                    }
                    None => {
                        return Err(ControllerError::Watch(format!("{} watch stream ended", kind)));
                    }
                },
            }
        }
    }
}

/// Starts watching `api` in the background and returns the live cache.
pub fn start<K: Initializable>(
    api: Api<K>,
    shutdown: CancellationToken,
) -> (ResourceCache<K>, JoinHandle<Result<(), ControllerError>>) {
    let (driver, cache) = WatchDriver::new(api);
    let handle = tokio::spawn(driver.run(shutdown));
    (cache, handle)
}

fn log_event<K: Initializable>(kind: &str, event: &watcher::Event<K>) {
    match event {
        watcher::Event::Apply(obj) => {
            debug!("{} applied: {}/{}", kind, obj.namespace().unwrap_or_default(), obj.name_any());
        }
        watcher::Event::Delete(obj) => {
            debug!("{} deleted: {}/{}", kind, obj.namespace().unwrap_or_default(), obj.name_any());
        }
        watcher::Event::Init => {
            info!("{} list started", kind);
        }
        watcher::Event::InitApply(obj) => {
            debug!("{} listed: {}/{}", kind, obj.namespace().unwrap_or_default(), obj.name_any());
        }
        watcher::Event::InitDone => {
            info!("{} list complete, following watch", kind);
        }
    }
}
