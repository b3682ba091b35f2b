//! Mock device bridge for testing.
//!
//! Implements [`DeviceBridge`] against an in-memory register bank, with
//! hand-injected update events instead of a polling loop. Lets the
//! engine run without hardware or a live transport.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::bridge::{DeviceBridge, UpdateChannels};
use crate::error::BridgeError;
use crate::types::{
    BoolUpdate, DataType, DwordUpdate, FloatUpdate, TransportParams, WordUpdate,
};

/// A write call recorded by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteCall {
    Coil {
        connection_id: i64,
        address: u16,
        value: bool,
    },
    Single {
        connection_id: i64,
        address: u16,
        value: u16,
    },
    Multiple {
        connection_id: i64,
        address: u16,
        values: Vec<u16>,
    },
}

#[derive(Debug, Default)]
struct MockState {
    next_id: i64,
    connections: HashMap<i64, String>,
    tasks: HashSet<(i64, u16, DataType, bool)>,
    writes: Vec<WriteCall>,
    coils: HashMap<u16, bool>,
    holding: HashMap<u16, u16>,
    input: HashMap<u16, u16>,
    reject_addresses: HashSet<u16>,
    reject_writes: Option<String>,
}

/// In-memory [`DeviceBridge`] double.
#[derive(Debug, Default)]
pub struct MockBridge {
    channels: UpdateChannels,
    state: Mutex<MockState>,
}

impl MockBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `register_task` reject this address.
    pub async fn reject_address(&self, address: u16) {
        self.state.lock().await.reject_addresses.insert(address);
    }

    /// Make every write call fail with the given message.
    pub async fn reject_writes(&self, message: &str) {
        self.state.lock().await.reject_writes = Some(message.to_string());
    }

    /// Number of connections the bridge has been asked to open and not
    /// yet disconnect.
    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.connections.len()
    }

    /// Registered tasks as `(connection, address, data_type, read_only)`.
    pub async fn registered_tasks(&self) -> HashSet<(i64, u16, DataType, bool)> {
        self.state.lock().await.tasks.clone()
    }

    /// Every write call issued so far, in order.
    pub async fn writes(&self) -> Vec<WriteCall> {
        self.state.lock().await.writes.clone()
    }

    /// Seed a holding register for on-demand reads.
    pub async fn set_holding_register(&self, address: u16, value: u16) {
        self.state.lock().await.holding.insert(address, value);
    }

    /// Seed an input register for on-demand reads.
    pub async fn set_input_register(&self, address: u16, value: u16) {
        self.state.lock().await.input.insert(address, value);
    }

    /// Inject a coil update event.
    pub fn push_bool(&self, connection_id: i64, address: u16, value: bool) {
        self.channels.publish_bool(BoolUpdate {
            connection_id,
            address,
            value,
        });
    }

    /// Inject a word update event.
    pub fn push_word(&self, connection_id: i64, address: u16, read_only: bool, value: u16) {
        self.channels.publish_word(WordUpdate {
            connection_id,
            address,
            read_only,
            value,
        });
    }

    /// Inject a dword update event.
    pub fn push_dword(&self, connection_id: i64, address: u16, read_only: bool, value: u32) {
        self.channels.publish_dword(DwordUpdate {
            connection_id,
            address,
            read_only,
            value,
        });
    }

    /// Inject a float update event.
    pub fn push_float(&self, connection_id: i64, address: u16, read_only: bool, value: f32) {
        self.channels.publish_float(FloatUpdate {
            connection_id,
            address,
            read_only,
            value,
        });
    }
}

#[async_trait]
impl DeviceBridge for MockBridge {
    async fn create_connection(&self, params: &TransportParams) -> Result<i64, BridgeError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = state.next_id;
        state.connections.insert(id, params.label());
        Ok(id)
    }

    async fn disconnect(&self, connection_id: i64) -> Result<(), BridgeError> {
        self.state.lock().await.connections.remove(&connection_id);
        Ok(())
    }

    async fn register_task(
        &self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        _interval_ms: u64,
        read_only: bool,
    ) -> Result<(), BridgeError> {
        let mut state = self.state.lock().await;
        if state.reject_addresses.contains(&address) {
            return Err(BridgeError::InvalidRequest(format!(
                "address {} not pollable",
                address
            )));
        }
        state
            .tasks
            .insert((connection_id, address, data_type, read_only));
        Ok(())
    }

    async fn unregister_task(
        &self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        read_only: bool,
    ) -> Result<(), BridgeError> {
        let mut state = self.state.lock().await;
        if !state
            .tasks
            .remove(&(connection_id, address, data_type, read_only))
        {
            return Err(BridgeError::InvalidRequest(format!(
                "no task at address {}",
                address
            )));
        }
        Ok(())
    }

    async fn write_single_coil(
        &self,
        connection_id: i64,
        address: u16,
        value: bool,
    ) -> Result<(), BridgeError> {
        let mut state = self.state.lock().await;
        if let Some(message) = &state.reject_writes {
            return Err(BridgeError::Protocol(message.clone()));
        }
        state.coils.insert(address, value);
        state.writes.push(WriteCall::Coil {
            connection_id,
            address,
            value,
        });
        Ok(())
    }

    async fn write_single_register(
        &self,
        connection_id: i64,
        address: u16,
        value: u16,
    ) -> Result<(), BridgeError> {
        let mut state = self.state.lock().await;
        if let Some(message) = &state.reject_writes {
            return Err(BridgeError::Protocol(message.clone()));
        }
        state.holding.insert(address, value);
        state.writes.push(WriteCall::Single {
            connection_id,
            address,
            value,
        });
        Ok(())
    }

    async fn write_multiple_registers(
        &self,
        connection_id: i64,
        address: u16,
        values: &[u16],
    ) -> Result<(), BridgeError> {
        let mut state = self.state.lock().await;
        if let Some(message) = &state.reject_writes {
            return Err(BridgeError::Protocol(message.clone()));
        }
        for (offset, &value) in values.iter().enumerate() {
            state
                .holding
                .insert(address.saturating_add(offset as u16), value);
        }
        state.writes.push(WriteCall::Multiple {
            connection_id,
            address,
            values: values.to_vec(),
        });
        Ok(())
    }

    async fn read_coils(
        &self,
        _connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<bool>, BridgeError> {
        let state = self.state.lock().await;
        Ok((0..quantity)
            .map(|offset| {
                let a = address.saturating_add(offset);
                state.coils.get(&a).copied().unwrap_or(false)
            })
            .collect())
    }

    async fn read_holding_registers(
        &self,
        _connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, BridgeError> {
        let state = self.state.lock().await;
        Ok((0..quantity)
            .map(|offset| {
                let a = address.saturating_add(offset);
                state.holding.get(&a).copied().unwrap_or(0)
            })
            .collect())
    }

    async fn read_input_registers(
        &self,
        _connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, BridgeError> {
        let state = self.state.lock().await;
        Ok((0..quantity)
            .map(|offset| {
                let a = address.saturating_add(offset);
                state.input.get(&a).copied().unwrap_or(0)
            })
            .collect())
    }

    fn updates(&self) -> &UpdateChannels {
        &self.channels
    }
}
