//! [`DeviceBridge`] implementation over the connection manager and poll
//! scheduler.

use std::sync::Arc;

use async_trait::async_trait;
use plcwatch_core::BridgeError;
use plcwatch_core::bridge::{DeviceBridge, UpdateChannels};
use plcwatch_core::types::{DataType, TransportParams};

use crate::manager::ConnectionManager;
use crate::scheduler::PollScheduler;

/// The Modbus device bridge: transport, wire protocol and polling loop.
pub struct ModbusBridge {
    manager: Arc<ConnectionManager>,
    scheduler: PollScheduler,
    channels: Arc<UpdateChannels>,
}

impl Default for ModbusBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl ModbusBridge {
    pub fn new() -> Self {
        let manager = Arc::new(ConnectionManager::new());
        let channels = Arc::new(UpdateChannels::new());
        let scheduler = PollScheduler::new(manager.clone(), channels.clone());
        Self {
            manager,
            scheduler,
            channels,
        }
    }

    /// Stop the polling loop. Registered tasks survive and resume when
    /// the next registration restarts the scheduler.
    pub async fn stop_polling(&self) {
        self.scheduler.stop().await;
    }
}

#[async_trait]
impl DeviceBridge for ModbusBridge {
    async fn create_connection(&self, params: &TransportParams) -> Result<i64, BridgeError> {
        self.manager.create_connection(params).await
    }

    async fn disconnect(&self, connection_id: i64) -> Result<(), BridgeError> {
        self.manager.disconnect(connection_id).await
    }

    async fn register_task(
        &self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        interval_ms: u64,
        read_only: bool,
    ) -> Result<(), BridgeError> {
        if !self.manager.connection_exists(connection_id).await {
            return Err(BridgeError::ClientNotFound(connection_id));
        }
        self.scheduler
            .register_task(connection_id, address, data_type, interval_ms, read_only)
            .await?;
        // Polling begins with the first registered task.
        self.scheduler.start().await;
        Ok(())
    }

    async fn unregister_task(
        &self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        read_only: bool,
    ) -> Result<(), BridgeError> {
        self.scheduler
            .unregister_task(connection_id, address, data_type, read_only)
            .await
    }

    async fn write_single_coil(
        &self,
        connection_id: i64,
        address: u16,
        value: bool,
    ) -> Result<(), BridgeError> {
        self.manager
            .write_single_coil(connection_id, address, value)
            .await
    }

    async fn write_single_register(
        &self,
        connection_id: i64,
        address: u16,
        value: u16,
    ) -> Result<(), BridgeError> {
        self.manager
            .write_single_register(connection_id, address, value)
            .await
    }

    async fn write_multiple_registers(
        &self,
        connection_id: i64,
        address: u16,
        values: &[u16],
    ) -> Result<(), BridgeError> {
        self.manager
            .write_multiple_registers(connection_id, address, values)
            .await
    }

    async fn read_coils(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<bool>, BridgeError> {
        self.manager
            .read_coils(connection_id, address, quantity)
            .await
    }

    async fn read_holding_registers(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, BridgeError> {
        self.manager
            .read_holding_registers(connection_id, address, quantity)
            .await
    }

    async fn read_input_registers(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, BridgeError> {
        self.manager
            .read_input_registers(connection_id, address, quantity)
            .await
    }

    fn updates(&self) -> &UpdateChannels {
        &self.channels
    }
}
