//! Registration of monitor items against the bridge.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::bridge::DeviceBridge;
use crate::error::{Error, Result};
use crate::types::{DataType, MonitorItem, MonitorKey};

/// Issues register/unregister calls to the bridge and tracks the
/// currently active item set per connection.
///
/// Batch registration is fail-fast: if one item is rejected, earlier
/// registrations in the batch stay in place and the caller cleans up with
/// [`TaskRegistrar::stop_monitor`]. Unregistration is always best-effort;
/// bridge failures during cleanup are logged, never surfaced, so local
/// removal can never get stuck behind a dead connection.
pub struct TaskRegistrar {
    bridge: Arc<dyn DeviceBridge>,
    tracked: HashSet<(i64, MonitorKey)>,
}

impl TaskRegistrar {
    pub fn new(bridge: Arc<dyn DeviceBridge>) -> Self {
        Self {
            bridge,
            tracked: HashSet::new(),
        }
    }

    /// Register every item with the bridge at the given poll interval.
    ///
    /// Stops at the first rejected item and returns its error; items
    /// registered before the failure remain tracked.
    pub async fn start_monitor(
        &mut self,
        connection_id: i64,
        items: &[MonitorItem],
        interval_ms: u64,
    ) -> Result<()> {
        for item in items {
            let key = item.key();
            self.bridge
                .register_task(
                    connection_id,
                    key.address,
                    key.data_type,
                    interval_ms,
                    key.read_only,
                )
                .await
                .map_err(|source| Error::Registration {
                    address: key.address,
                    item: key.data_type.to_string(),
                    source,
                })?;

            debug!(
                connection_id,
                address = key.address,
                data_type = %key.data_type,
                read_only = key.read_only,
                "Registered monitor task"
            );
            self.tracked.insert((connection_id, key));
        }
        Ok(())
    }

    /// Unregister every tracked item, then discard the tracked set.
    ///
    /// Idempotent: with no active items this is a no-op.
    pub async fn stop_monitor(&mut self) {
        for (connection_id, key) in std::mem::take(&mut self.tracked) {
            if let Err(e) = self
                .bridge
                .unregister_task(connection_id, key.address, key.data_type, key.read_only)
                .await
            {
                warn!(
                    connection_id,
                    address = key.address,
                    data_type = %key.data_type,
                    "Failed to unregister monitor task: {}",
                    e
                );
            }
        }
    }

    /// Remove a single item.
    ///
    /// Succeeds even if the item was never registered; the bridge call is
    /// fire-and-forget and failures are logged.
    pub async fn unregister_item(
        &mut self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        read_only: bool,
    ) {
        let key = MonitorItem::new(address, data_type, read_only).key();
        if let Err(e) = self
            .bridge
            .unregister_task(connection_id, key.address, key.data_type, key.read_only)
            .await
        {
            warn!(
                connection_id,
                address,
                data_type = %data_type,
                "Failed to unregister monitor task: {}",
                e
            );
        }
        self.tracked.remove(&(connection_id, key));
    }

    /// Number of items currently tracked.
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    /// Whether an item is currently tracked for a connection.
    pub fn is_tracked(&self, connection_id: i64, key: &MonitorKey) -> bool {
        self.tracked.contains(&(connection_id, *key))
    }
}
