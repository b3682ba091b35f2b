//! Modbus register watcher.
//!
//! Connects to a controller, registers the configured monitor set and
//! logs live values until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use plcwatch_bridge_modbus::ModbusBridge;
use plcwatch_bridge_modbus::config::WatchConfig;
use plcwatch_core::{LoggingConfig, MonitorSession};

/// Watch and mutate registers of a Modbus controller (TCP/RTU).
#[derive(Parser, Debug)]
#[command(name = "plcwatch-bridge-modbus")]
#[command(about = "Polls Modbus registers and logs live values")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "plcwatch.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = WatchConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    plcwatch_core::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting plcwatch-bridge-modbus");
    info!("Loaded configuration from {:?}", args.config);

    // Connect to the controller
    let bridge = Arc::new(ModbusBridge::new());
    let mut session = MonitorSession::new(bridge.clone());

    let handle = session
        .connect(&config.connection)
        .await
        .with_context(|| format!("Failed to connect to '{}'", config.connection.label()))?;

    // Register the monitor set
    session
        .start_monitor(handle.id, &config.monitor.items, config.monitor.interval_ms)
        .await
        .context("Failed to register monitor items")?;

    info!(
        "Watching {} item(s) on '{}' every {}ms",
        config.monitor.items.len(),
        handle.label,
        config.monitor.interval_ms
    );

    // Log a snapshot of the live values once per poll interval, until
    // shutdown.
    let mut ticker = tokio::time::interval(Duration::from_millis(config.monitor.interval_ms));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => log_snapshot(&session).await,
        }
    }

    info!("Received shutdown signal");

    // Ordered teardown: unregister tasks, close subscriptions, clear the
    // store, then drop the connection.
    session.stop_monitor().await;
    session.disconnect(handle.id).await;
    bridge.stop_polling().await;

    info!("plcwatch-bridge-modbus stopped");
    Ok(())
}

async fn log_snapshot(session: &MonitorSession) {
    let values = session.values().await;
    if values.is_empty() {
        return;
    }

    for (address, value) in values.bools() {
        info!(address, value, "coil");
    }
    for (address, value) in values.registers(true) {
        info!(address, %value, "input register");
    }
    for (address, value) in values.registers(false) {
        info!(address, %value, "holding register");
    }
}
