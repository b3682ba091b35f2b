//! plcwatch core library
//!
//! The register monitoring subscription engine: everything between an
//! operator-facing frontend and the device bridge that owns the physical
//! field-bus transport.
//!
//! - [`codec`] - 32-bit integer/float to register word pair conversion
//! - [`types`] - Data types, monitor items, tagged values, update events
//! - [`store`] - Partitioned, address-keyed live-value store
//! - [`registry`] - Connection handle bookkeeping
//! - [`bridge`] - The `DeviceBridge` trait and typed update channels
//! - [`registrar`] - Monitor task registration against the bridge
//! - [`reconciler`] - Update event to store reconciliation
//! - [`writer`] - Operator value writes
//! - [`session`] - The composed engine
//! - [`mock`] - In-memory bridge double for tests
//! - [`config`] - Configuration loading (JSON5 format)
//! - [`error`] - Error types

pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod mock;
pub mod reconciler;
pub mod registrar;
pub mod registry;
pub mod session;
pub mod store;
pub mod types;
pub mod writer;

// Re-export commonly used types at the crate root
pub use bridge::{DeviceBridge, UpdateChannels};
pub use config::{LogFormat, LoggingConfig, load_config, parse_config};
pub use error::{BridgeError, Error, Result};
pub use reconciler::{EventReconciler, SharedStore, SubscriptionHandle};
pub use registrar::TaskRegistrar;
pub use registry::ConnectionRegistry;
pub use session::{DEFAULT_INTERVAL_MS, MonitorSession};
pub use store::ValueStore;
pub use types::{
    BoolUpdate, ConnectionHandle, DataType, DwordUpdate, FloatUpdate, MonitorItem, MonitorKey,
    MonitorValue, TransportParams, WordUpdate,
};
pub use writer::{ValueWriter, WriteConfirmation};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
