//! The device bridge seam.
//!
//! The bridge owns the physical transport, the wire protocol and the
//! actual polling loop. The engine only calls the entry points below and
//! consumes the typed update channels; [`crate::mock::MockBridge`] stands
//! in for tests, `plcwatch-bridge-modbus` talks to real hardware.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::BridgeError;
use crate::types::{BoolUpdate, DataType, DwordUpdate, FloatUpdate, TransportParams, WordUpdate};

/// Buffered events per typed channel before a slow subscriber lags.
const CHANNEL_CAPACITY: usize = 256;

/// The four typed update channels a bridge pushes polled values through.
///
/// Channels deliver asynchronously and give no ordering guarantee across
/// data types. Subscribing yields a receiver whose lifetime is a
/// first-class value; dropping it closes the subscription.
#[derive(Debug)]
pub struct UpdateChannels {
    bool_tx: broadcast::Sender<BoolUpdate>,
    word_tx: broadcast::Sender<WordUpdate>,
    dword_tx: broadcast::Sender<DwordUpdate>,
    float_tx: broadcast::Sender<FloatUpdate>,
}

impl Default for UpdateChannels {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateChannels {
    pub fn new() -> Self {
        Self {
            bool_tx: broadcast::channel(CHANNEL_CAPACITY).0,
            word_tx: broadcast::channel(CHANNEL_CAPACITY).0,
            dword_tx: broadcast::channel(CHANNEL_CAPACITY).0,
            float_tx: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe_bool(&self) -> broadcast::Receiver<BoolUpdate> {
        self.bool_tx.subscribe()
    }

    pub fn subscribe_word(&self) -> broadcast::Receiver<WordUpdate> {
        self.word_tx.subscribe()
    }

    pub fn subscribe_dword(&self) -> broadcast::Receiver<DwordUpdate> {
        self.dword_tx.subscribe()
    }

    pub fn subscribe_float(&self) -> broadcast::Receiver<FloatUpdate> {
        self.float_tx.subscribe()
    }

    /// Push a coil update. Events with no live subscriber are dropped.
    pub fn publish_bool(&self, update: BoolUpdate) {
        let _ = self.bool_tx.send(update);
    }

    pub fn publish_word(&self, update: WordUpdate) {
        let _ = self.word_tx.send(update);
    }

    pub fn publish_dword(&self, update: DwordUpdate) {
        let _ = self.dword_tx.send(update);
    }

    pub fn publish_float(&self, update: FloatUpdate) {
        let _ = self.float_tx.send(update);
    }
}

/// Entry points of the external communication bridge.
///
/// Write calls take values already codec-encoded for the two-register
/// types; read calls return raw register words. Implementations surface
/// their own error messages through [`BridgeError`] and this layer passes
/// them on verbatim.
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Open a connection and return its id. Fails on transport errors.
    async fn create_connection(&self, params: &TransportParams) -> Result<i64, BridgeError>;

    /// Close a connection. Expected to be idempotent.
    async fn disconnect(&self, connection_id: i64) -> Result<(), BridgeError>;

    /// Start bridge-side polling for one monitored address.
    async fn register_task(
        &self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        interval_ms: u64,
        read_only: bool,
    ) -> Result<(), BridgeError>;

    /// Stop bridge-side polling for one monitored address.
    async fn unregister_task(
        &self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        read_only: bool,
    ) -> Result<(), BridgeError>;

    async fn write_single_coil(
        &self,
        connection_id: i64,
        address: u16,
        value: bool,
    ) -> Result<(), BridgeError>;

    async fn write_single_register(
        &self,
        connection_id: i64,
        address: u16,
        value: u16,
    ) -> Result<(), BridgeError>;

    async fn write_multiple_registers(
        &self,
        connection_id: i64,
        address: u16,
        values: &[u16],
    ) -> Result<(), BridgeError>;

    /// On-demand read outside the monitor loop.
    async fn read_coils(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<bool>, BridgeError>;

    async fn read_holding_registers(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, BridgeError>;

    async fn read_input_registers(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, BridgeError>;

    /// The typed update channels this bridge publishes into.
    fn updates(&self) -> &UpdateChannels;
}
