//! Shared domain types for the monitoring engine.

use serde::{Deserialize, Serialize};

/// Data type of a monitored address.
///
/// Word/DWord/Float additionally carry a read-only axis (input-register
/// class vs holding-register class); Bool does not, coils are always
/// read-write in this model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Single-bit coil.
    Bool,
    /// Unsigned 16-bit register.
    Word,
    /// Unsigned 32-bit integer spanning two registers.
    DWord,
    /// IEEE-754 single-precision float spanning two registers.
    Float,
}

impl DataType {
    /// Return the string name for this data type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Word => "word",
            DataType::DWord => "dword",
            DataType::Float => "float",
        }
    }

    /// Number of 16-bit registers one value of this type occupies.
    pub fn register_count(&self) -> u16 {
        match self {
            DataType::Bool | DataType::Word => 1,
            DataType::DWord | DataType::Float => 2,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One address under active polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitorItem {
    /// Register or coil address (0-based).
    pub address: u16,

    /// Data type at that address.
    pub data_type: DataType,

    /// Input-register class (read-only) vs holding-register class.
    /// Ignored for Bool.
    #[serde(default)]
    pub read_only: bool,
}

impl MonitorItem {
    pub fn new(address: u16, data_type: DataType, read_only: bool) -> Self {
        Self {
            address,
            data_type,
            read_only,
        }
    }

    /// The unique key of this item within a connection.
    pub fn key(&self) -> MonitorKey {
        MonitorKey {
            address: self.address,
            data_type: self.data_type,
            // Bool has no read-only axis; normalize so {addr, Bool, true}
            // and {addr, Bool, false} are the same key.
            read_only: self.data_type != DataType::Bool && self.read_only,
        }
    }
}

/// Unique key of a monitor item within a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorKey {
    pub address: u16,
    pub data_type: DataType,
    pub read_only: bool,
}

/// A live value as merged into the store, tagged by data type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorValue {
    Bool(bool),
    Word(u16),
    DWord(u32),
    Float(f32),
}

impl MonitorValue {
    /// Data type tag of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            MonitorValue::Bool(_) => DataType::Bool,
            MonitorValue::Word(_) => DataType::Word,
            MonitorValue::DWord(_) => DataType::DWord,
            MonitorValue::Float(_) => DataType::Float,
        }
    }
}

impl std::fmt::Display for MonitorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorValue::Bool(v) => write!(f, "{}", v),
            MonitorValue::Word(v) => write!(f, "{}", v),
            MonitorValue::DWord(v) => write!(f, "{}", v),
            MonitorValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Transport parameters for a bridge connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportParams {
    /// Modbus TCP endpoint.
    Tcp {
        host: String,
        port: u16,
    },
    /// Serial (RTU) endpoint.
    Serial {
        port: String,
        baud_rate: u32,
        slave_id: u8,
    },
}

impl TransportParams {
    /// Label identifying this endpoint among live connections.
    ///
    /// Two UI-level connection attempts with the same label are the same
    /// endpoint; the registry rejects the second one.
    pub fn label(&self) -> String {
        match self {
            TransportParams::Tcp { host, port } => format!("{}:{}", host, port),
            TransportParams::Serial {
                port, baud_rate, ..
            } => format!("{}:{}", port, baud_rate),
        }
    }
}

/// A live connection as tracked by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    /// Connection id issued by the bridge.
    pub id: i64,

    /// Label derived from the transport parameters.
    pub label: String,
}

/// Update event from the bridge's bool channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoolUpdate {
    pub connection_id: i64,
    pub address: u16,
    pub value: bool,
}

/// Update event from the bridge's word channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordUpdate {
    pub connection_id: i64,
    pub address: u16,
    pub read_only: bool,
    pub value: u16,
}

/// Update event from the bridge's dword channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwordUpdate {
    pub connection_id: i64,
    pub address: u16,
    pub read_only: bool,
    pub value: u32,
}

/// Update event from the bridge's float channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatUpdate {
    pub connection_id: i64,
    pub address: u16,
    pub read_only: bool,
    pub value: f32,
}
