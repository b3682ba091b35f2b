//! Modbus device bridge for the plcwatch monitoring engine.
//!
//! Implements the engine's `DeviceBridge` seam over tokio-modbus, for
//! TCP and RTU/serial controllers: connection management, the bridge-side
//! polling scheduler, and the four typed update channels the engine
//! subscribes to.

pub mod bridge;
pub mod config;
pub mod manager;
pub mod scheduler;

pub use bridge::ModbusBridge;
pub use config::WatchConfig;
pub use manager::ConnectionManager;
pub use scheduler::PollScheduler;
