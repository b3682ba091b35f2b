//! Modbus connection management (TCP and RTU/serial).

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use plcwatch_core::BridgeError;
use plcwatch_core::types::TransportParams;
use tokio::sync::Mutex;
use tokio_modbus::client::{Context, Reader, Writer};
use tokio_modbus::prelude::*;
use tracing::{debug, info};

/// Connect timeout for TCP endpoints.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Serial connection ids live above this base so they never collide with
/// the TCP id scheme.
const SERIAL_ID_BASE: i64 = 1 << 48;

/// Owns the live Modbus client contexts, keyed by connection id.
///
/// TCP ids are derived from the resolved IPv4 address and port, so the
/// same endpoint always maps to the same id. Serial ids are sequential.
pub struct ConnectionManager {
    clients: Mutex<HashMap<i64, Arc<Mutex<Context>>>>,
    next_serial_id: Mutex<i64>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_serial_id: Mutex::new(SERIAL_ID_BASE),
        }
    }

    /// Open a connection and return its id.
    ///
    /// Reconnecting to an endpoint that is already open returns the
    /// existing id without touching the transport.
    pub async fn create_connection(&self, params: &TransportParams) -> Result<i64, BridgeError> {
        match params {
            TransportParams::Tcp { host, port } => self.create_tcp(host, *port).await,
            TransportParams::Serial {
                port,
                baud_rate,
                slave_id,
            } => self.create_serial(port, *baud_rate, *slave_id).await,
        }
    }

    async fn create_tcp(&self, host: &str, port: u16) -> Result<i64, BridgeError> {
        let ip = resolve_ipv4(host, port).await?;
        let id = tcp_connection_id(ip, port);

        {
            let clients = self.clients.lock().await;
            if clients.contains_key(&id) {
                debug!(id, "TCP connection already open, reusing");
                return Ok(id);
            }
        }

        let addr = SocketAddr::new(IpAddr::V4(ip), port);
        let ctx = tokio::time::timeout(CONNECT_TIMEOUT, tcp::connect_slave(addr, Slave(1)))
            .await
            .map_err(|_| BridgeError::Connection("Connection timeout".to_string()))?
            .map_err(|e| BridgeError::Connection(e.to_string()))?;

        self.clients
            .lock()
            .await
            .insert(id, Arc::new(Mutex::new(ctx)));
        info!(id, %addr, "Modbus TCP connection opened");
        Ok(id)
    }

    async fn create_serial(
        &self,
        port: &str,
        baud_rate: u32,
        slave_id: u8,
    ) -> Result<i64, BridgeError> {
        let builder = tokio_serial::new(port, baud_rate);
        let serial = tokio_serial::SerialStream::open(&builder)
            .map_err(|e| BridgeError::Connection(format!("Serial open failed: {}", e)))?;

        let ctx = rtu::attach_slave(serial, Slave(slave_id));

        let id = {
            let mut next = self.next_serial_id.lock().await;
            *next += 1;
            *next
        };
        self.clients
            .lock()
            .await
            .insert(id, Arc::new(Mutex::new(ctx)));
        info!(id, port, baud_rate, slave_id, "Modbus RTU connection opened");
        Ok(id)
    }

    /// Close and forget a connection. No-op if the id is unknown.
    pub async fn disconnect(&self, connection_id: i64) -> Result<(), BridgeError> {
        let client = self.clients.lock().await.remove(&connection_id);
        if let Some(client) = client {
            let mut ctx = client.lock().await;
            if let Err(e) = ctx.disconnect().await {
                debug!(connection_id, "Error while closing Modbus context: {}", e);
            }
            info!(connection_id, "Modbus connection closed");
        }
        Ok(())
    }

    /// Whether a connection with this id is currently open.
    pub async fn connection_exists(&self, connection_id: i64) -> bool {
        self.clients.lock().await.contains_key(&connection_id)
    }

    async fn client(&self, connection_id: i64) -> Result<Arc<Mutex<Context>>, BridgeError> {
        self.clients
            .lock()
            .await
            .get(&connection_id)
            .cloned()
            .ok_or(BridgeError::ClientNotFound(connection_id))
    }

    pub async fn read_coils(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<bool>, BridgeError> {
        let client = self.client(connection_id).await?;
        let mut ctx = client.lock().await;
        flatten(ctx.read_coils(address, quantity).await)
    }

    pub async fn read_holding_registers(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, BridgeError> {
        let client = self.client(connection_id).await?;
        let mut ctx = client.lock().await;
        flatten(ctx.read_holding_registers(address, quantity).await)
    }

    pub async fn read_input_registers(
        &self,
        connection_id: i64,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, BridgeError> {
        let client = self.client(connection_id).await?;
        let mut ctx = client.lock().await;
        flatten(ctx.read_input_registers(address, quantity).await)
    }

    pub async fn write_single_coil(
        &self,
        connection_id: i64,
        address: u16,
        value: bool,
    ) -> Result<(), BridgeError> {
        let client = self.client(connection_id).await?;
        let mut ctx = client.lock().await;
        flatten(ctx.write_single_coil(address, value).await)
    }

    pub async fn write_single_register(
        &self,
        connection_id: i64,
        address: u16,
        value: u16,
    ) -> Result<(), BridgeError> {
        let client = self.client(connection_id).await?;
        let mut ctx = client.lock().await;
        flatten(ctx.write_single_register(address, value).await)
    }

    pub async fn write_multiple_registers(
        &self,
        connection_id: i64,
        address: u16,
        values: &[u16],
    ) -> Result<(), BridgeError> {
        let client = self.client(connection_id).await?;
        let mut ctx = client.lock().await;
        flatten(ctx.write_multiple_registers(address, values).await)
    }
}

/// Collapse tokio-modbus' transport/exception result nesting into a
/// [`BridgeError`], keeping the device's exception text verbatim.
fn flatten<T, E, X>(result: Result<Result<T, X>, E>) -> Result<T, BridgeError>
where
    E: std::fmt::Display,
    X: std::fmt::Debug,
{
    result
        .map_err(|e| BridgeError::Protocol(e.to_string()))?
        .map_err(|e| BridgeError::Protocol(format!("Exception: {:?}", e)))
}

/// Resolve a hostname or dotted-quad string to an IPv4 address.
async fn resolve_ipv4(host: &str, port: u16) -> Result<Ipv4Addr, BridgeError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(ip);
    }

    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| BridgeError::Connection(format!("Cannot resolve '{}': {}", host, e)))?;

    for addr in addrs {
        if let IpAddr::V4(ip) = addr.ip() {
            return Ok(ip);
        }
    }
    Err(BridgeError::Connection(format!(
        "No IPv4 address for '{}'",
        host
    )))
}

/// Derive a stable connection id from an IPv4 endpoint.
fn tcp_connection_id(ip: Ipv4Addr, port: u16) -> i64 {
    ((u32::from(ip) as i64) << 16) | (port as i64)
}
