//! Reconciliation of bridge update events into the live-value store.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bridge::DeviceBridge;
use crate::store::ValueStore;
use crate::types::MonitorValue;

/// Shared handle to the live-value store.
///
/// Mutated only by the reconciler's listener tasks; everyone else reads.
pub type SharedStore = Arc<RwLock<ValueStore>>;

/// An open subscription on one typed update channel.
///
/// Must be explicitly closed when monitoring stops; a leaked handle keeps
/// a listener alive that mutates a store the caller no longer considers
/// active.
#[derive(Debug)]
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Close the subscription.
    pub fn close(self) {
        self.task.abort();
    }
}

/// Merges the bridge's four typed update channels into the store.
///
/// Events arrive asynchronously and out of order across channels; the
/// merge rule is last-write-wins per partition and address. Events for
/// other connections are filtered out.
pub struct EventReconciler {
    bridge: Arc<dyn DeviceBridge>,
    store: SharedStore,
    subscriptions: Vec<SubscriptionHandle>,
}

impl EventReconciler {
    pub fn new(bridge: Arc<dyn DeviceBridge>, store: SharedStore) -> Self {
        Self {
            bridge,
            store,
            subscriptions: Vec::new(),
        }
    }

    /// Open one subscription per typed channel, filtered to
    /// `connection_id`.
    ///
    /// Call at most once per monitoring session; a double call would open
    /// a second set of listeners that writes identical merged values.
    pub fn setup_listeners(&mut self, connection_id: i64) {
        let channels = self.bridge.updates();

        self.subscriptions.push(spawn_listener(
            "bool",
            channels.subscribe_bool(),
            self.store.clone(),
            move |store, update| {
                if update.connection_id == connection_id {
                    store.merge_bool(update.address, update.value);
                }
            },
        ));
        self.subscriptions.push(spawn_listener(
            "word",
            channels.subscribe_word(),
            self.store.clone(),
            move |store, update| {
                if update.connection_id == connection_id {
                    store.merge_register(
                        update.read_only,
                        update.address,
                        MonitorValue::Word(update.value),
                    );
                }
            },
        ));
        self.subscriptions.push(spawn_listener(
            "dword",
            channels.subscribe_dword(),
            self.store.clone(),
            move |store, update| {
                if update.connection_id == connection_id {
                    store.merge_register(
                        update.read_only,
                        update.address,
                        MonitorValue::DWord(update.value),
                    );
                }
            },
        ));
        self.subscriptions.push(spawn_listener(
            "float",
            channels.subscribe_float(),
            self.store.clone(),
            move |store, update| {
                if update.connection_id == connection_id {
                    store.merge_register(
                        update.read_only,
                        update.address,
                        MonitorValue::Float(update.value),
                    );
                }
            },
        ));

        debug!(connection_id, "Opened update channel subscriptions");
    }

    /// Close every open subscription, then clear the store.
    ///
    /// Runs in this order so a stale value can never be written back
    /// after the clear. Idempotent.
    pub async fn cleanup_listeners(&mut self) {
        for handle in self.subscriptions.drain(..) {
            handle.close();
        }
        self.store.write().await.clear();
        debug!("Closed update channel subscriptions and cleared store");
    }

    /// Number of open subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

/// Drain one typed channel into the store until it closes or the
/// subscription is closed.
fn spawn_listener<T, F>(
    channel: &'static str,
    mut rx: Receiver<T>,
    store: SharedStore,
    merge: F,
) -> SubscriptionHandle
where
    T: Clone + Send + 'static,
    F: Fn(&mut ValueStore, T) + Send + 'static,
{
    let task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(update) => {
                    let mut store = store.write().await;
                    merge(&mut store, update);
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(channel, missed, "Update channel lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
    SubscriptionHandle { task }
}
