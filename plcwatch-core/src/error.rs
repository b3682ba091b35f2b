use thiserror::Error;

/// Errors reported by a device bridge.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("No connection with id {0}")]
    ClientNotFound(i64),

    #[error("Not connected")]
    NotConnected,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Error type for the monitoring engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A connection with the same transport label already exists.
    #[error("Connection '{0}' already exists")]
    DuplicateConnection(String),

    /// Batch registration rejected; earlier registrations in the batch
    /// stay in place until stop/remove.
    #[error("Failed to register {item} @ {address}: {source}")]
    Registration {
        address: u16,
        item: String,
        source: BridgeError,
    },

    /// Operator-supplied literal did not parse for the selected data type.
    #[error("Cannot parse '{literal}' as {expected}")]
    Parse { literal: String, expected: String },

    /// Underlying bridge call failed; message surfaced verbatim.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using the engine's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
