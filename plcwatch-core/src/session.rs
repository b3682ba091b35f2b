//! The composed monitoring engine.
//!
//! [`MonitorSession`] owns the registry, registrar, reconciler and writer
//! over a shared bridge handle. It is a plain value constructed by the
//! hosting application; there is no process-wide instance.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::bridge::DeviceBridge;
use crate::error::Result;
use crate::reconciler::{EventReconciler, SharedStore};
use crate::registrar::TaskRegistrar;
use crate::registry::ConnectionRegistry;
use crate::store::ValueStore;
use crate::types::{ConnectionHandle, DataType, MonitorItem, TransportParams};
use crate::writer::{ValueWriter, WriteConfirmation};

/// Default bridge-side poll interval for monitor items.
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// One operator-facing monitoring session over a device bridge.
pub struct MonitorSession {
    bridge: Arc<dyn DeviceBridge>,
    registry: ConnectionRegistry,
    registrar: TaskRegistrar,
    reconciler: EventReconciler,
    writer: ValueWriter,
    store: SharedStore,
    monitoring: Option<i64>,
}

impl MonitorSession {
    pub fn new(bridge: Arc<dyn DeviceBridge>) -> Self {
        let store: SharedStore = Arc::new(RwLock::new(ValueStore::new()));
        Self {
            registry: ConnectionRegistry::new(),
            registrar: TaskRegistrar::new(bridge.clone()),
            reconciler: EventReconciler::new(bridge.clone(), store.clone()),
            writer: ValueWriter::new(bridge.clone()),
            store,
            bridge,
            monitoring: None,
        }
    }

    /// Open a connection to the endpoint described by `params`.
    ///
    /// A duplicate transport label is rejected locally before any bridge
    /// call is made.
    pub async fn connect(&mut self, params: &TransportParams) -> Result<ConnectionHandle> {
        self.registry.ensure_available(params)?;
        let id = self.bridge.create_connection(params).await?;
        let handle = self.registry.create(id, params)?;
        info!(id, label = %handle.label, "Connection established");
        Ok(handle)
    }

    /// Tear down a connection.
    ///
    /// Stops monitoring first if this connection is being monitored.
    /// Bridge-side disconnect failures are logged, never surfaced, and
    /// never block removal of the local handle.
    pub async fn disconnect(&mut self, connection_id: i64) {
        if self.monitoring == Some(connection_id) {
            self.stop_monitor().await;
        }
        if let Err(e) = self.bridge.disconnect(connection_id).await {
            warn!(connection_id, "Bridge disconnect failed: {}", e);
        }
        self.registry.remove(connection_id);
        info!(connection_id, "Connection removed");
    }

    /// Register `items` for polling and open the update subscriptions.
    ///
    /// A session monitors one connection at a time: switching to a
    /// different connection stops the previous monitor first, so its
    /// tasks and listeners never outlive the switch.
    ///
    /// Fail-fast: the first rejected item aborts the batch with its
    /// error; items registered before it stay active until
    /// [`MonitorSession::stop_monitor`].
    pub async fn start_monitor(
        &mut self,
        connection_id: i64,
        items: &[MonitorItem],
        interval_ms: u64,
    ) -> Result<()> {
        if let Some(previous) = self.monitoring {
            if previous != connection_id {
                self.stop_monitor().await;
            }
        }

        self.registrar
            .start_monitor(connection_id, items, interval_ms)
            .await?;

        if self.monitoring != Some(connection_id) {
            self.reconciler.setup_listeners(connection_id);
            self.monitoring = Some(connection_id);
        }
        info!(
            connection_id,
            items = items.len(),
            interval_ms,
            "Monitoring started"
        );
        Ok(())
    }

    /// Stop monitoring: unregister every tracked item, then close the
    /// subscriptions and clear the store.
    ///
    /// Two ordered phases. Unregister calls are issued before any
    /// subscription closes, so an event still in flight lands in a live
    /// store instead of being silently dropped into a torn-down one.
    /// Idempotent: a no-op when nothing is monitored.
    pub async fn stop_monitor(&mut self) {
        self.registrar.stop_monitor().await;
        self.reconciler.cleanup_listeners().await;
        if let Some(connection_id) = self.monitoring.take() {
            info!(connection_id, "Monitoring stopped");
        }
    }

    /// Remove a single monitor item, best-effort.
    pub async fn unregister_item(
        &mut self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        read_only: bool,
    ) {
        self.registrar
            .unregister_item(connection_id, address, data_type, read_only)
            .await;
    }

    /// Parse and write one operator-supplied value.
    pub async fn write_value(
        &self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        literal: &str,
    ) -> Result<WriteConfirmation> {
        self.writer
            .write_value(connection_id, address, data_type, literal)
            .await
    }

    /// On-demand holding-register read outside the monitor loop.
    pub async fn read_holding_registers(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>> {
        Ok(self
            .bridge
            .read_holding_registers(connection_id, address, quantity)
            .await?)
    }

    /// On-demand input-register read outside the monitor loop.
    pub async fn read_input_registers(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>> {
        Ok(self
            .bridge
            .read_input_registers(connection_id, address, quantity)
            .await?)
    }

    /// On-demand coil read outside the monitor loop.
    pub async fn read_coils(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<bool>> {
        Ok(self
            .bridge
            .read_coils(connection_id, address, quantity)
            .await?)
    }

    /// Shared handle to the live-value store (read-side).
    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// Snapshot of the current live values.
    pub async fn values(&self) -> ValueStore {
        self.store.read().await.clone()
    }

    /// The connection currently being monitored, if any.
    pub fn monitored_connection(&self) -> Option<i64> {
        self.monitoring
    }

    /// Live connection handles.
    pub fn connections(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.registry.handles()
    }
}
