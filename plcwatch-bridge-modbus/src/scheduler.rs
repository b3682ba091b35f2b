//! Bridge-side polling scheduler.
//!
//! Polled addresses are grouped by interval; a millisecond tick counter
//! decides which groups are due. Each due task reads its address through
//! the connection manager and pushes the decoded value into the typed
//! update channels. Word/DWord/Float tasks read the holding- or
//! input-register class depending on their read-only flag; two-register
//! values are decoded low word first through the core codec.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use plcwatch_core::bridge::UpdateChannels;
use plcwatch_core::types::{BoolUpdate, DataType, DwordUpdate, FloatUpdate, WordUpdate};
use plcwatch_core::{BridgeError, codec};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

/// Key of one polled address: connection, address, data type, register
/// class. The same address may be polled in both register classes at
/// once.
type TaskKey = (i64, u16, DataType, bool);

#[derive(Debug, Clone, Copy)]
struct TaskDefinition {
    connection_id: i64,
    address: u16,
    data_type: DataType,
    read_only: bool,
    interval_ms: u64,
}

/// Schedules periodic reads for registered monitor tasks.
pub struct PollScheduler {
    tasks: Arc<Mutex<HashMap<TaskKey, TaskDefinition>>>,
    tasks_by_interval: Arc<Mutex<HashMap<u64, HashSet<TaskKey>>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    manager: Arc<crate::manager::ConnectionManager>,
    channels: Arc<UpdateChannels>,
}

impl PollScheduler {
    pub fn new(
        manager: Arc<crate::manager::ConnectionManager>,
        channels: Arc<UpdateChannels>,
    ) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            tasks_by_interval: Arc::new(Mutex::new(HashMap::new())),
            timer: Mutex::new(None),
            manager,
            channels,
        }
    }

    /// Add a task to the schedule. Re-registering the same key replaces
    /// its interval.
    pub async fn register_task(
        &self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        interval_ms: u64,
        read_only: bool,
    ) -> Result<(), BridgeError> {
        if interval_ms == 0 {
            return Err(BridgeError::InvalidRequest(
                "Poll interval must be non-zero".to_string(),
            ));
        }

        let key: TaskKey = (connection_id, address, data_type, read_only);
        let task = TaskDefinition {
            connection_id,
            address,
            data_type,
            read_only,
            interval_ms,
        };

        let mut tasks = self.tasks.lock().await;
        let mut by_interval = self.tasks_by_interval.lock().await;
        if let Some(previous) = tasks.insert(key, task) {
            if let Some(group) = by_interval.get_mut(&previous.interval_ms) {
                group.remove(&key);
                if group.is_empty() {
                    by_interval.remove(&previous.interval_ms);
                }
            }
        }
        by_interval.entry(interval_ms).or_default().insert(key);

        debug!(
            connection_id,
            address,
            data_type = %data_type,
            read_only,
            interval_ms,
            "Poll task registered"
        );
        Ok(())
    }

    /// Remove a task from the schedule.
    pub async fn unregister_task(
        &self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        read_only: bool,
    ) -> Result<(), BridgeError> {
        let key: TaskKey = (connection_id, address, data_type, read_only);

        let mut tasks = self.tasks.lock().await;
        let Some(task) = tasks.remove(&key) else {
            return Err(BridgeError::InvalidRequest(format!(
                "No poll task for address {} on connection {}",
                address, connection_id
            )));
        };

        let mut by_interval = self.tasks_by_interval.lock().await;
        if let Some(group) = by_interval.get_mut(&task.interval_ms) {
            group.remove(&key);
            if group.is_empty() {
                by_interval.remove(&task.interval_ms);
            }
        }

        debug!(connection_id, address, data_type = %data_type, "Poll task unregistered");
        Ok(())
    }

    /// Start the tick loop. Idempotent.
    pub async fn start(&self) {
        let mut timer = self.timer.lock().await;
        if timer.is_some() {
            return;
        }

        let tasks = self.tasks.clone();
        let tasks_by_interval = self.tasks_by_interval.clone();
        let manager = self.manager.clone();
        let channels = self.channels.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_millis(1));
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            let mut counter: u64 = 0;

            loop {
                interval.tick().await;
                counter = counter.wrapping_add(1);

                let due: Vec<TaskKey> = {
                    let by_interval = tasks_by_interval.lock().await;
                    by_interval
                        .iter()
                        .filter(|(interval_ms, _)| counter % **interval_ms == 0)
                        .flat_map(|(_, keys)| keys.iter().copied())
                        .collect()
                };

                for key in due {
                    let task = {
                        let tasks = tasks.lock().await;
                        tasks.get(&key).copied()
                    };
                    if let Some(task) = task {
                        execute_task(&manager, &channels, &task).await;
                    }
                }
            }
        });

        *timer = Some(handle);
        info!("Poll scheduler started");
    }

    /// Stop the tick loop. The task table is kept; `start` resumes it.
    pub async fn stop(&self) {
        let mut timer = self.timer.lock().await;
        if let Some(handle) = timer.take() {
            handle.abort();
            info!("Poll scheduler stopped");
        }
    }

    /// Number of registered poll tasks.
    pub async fn task_count(&self) -> usize {
        self.tasks.lock().await.len()
    }
}

/// Read one task's address and publish the decoded value.
///
/// Read failures are logged and the tick skipped; the next due tick
/// retries naturally.
async fn execute_task(
    manager: &crate::manager::ConnectionManager,
    channels: &UpdateChannels,
    task: &TaskDefinition,
) {
    let result = match task.data_type {
        DataType::Bool => match manager.read_coils(task.connection_id, task.address, 1).await {
            Ok(values) => {
                if let Some(&value) = values.first() {
                    channels.publish_bool(BoolUpdate {
                        connection_id: task.connection_id,
                        address: task.address,
                        value,
                    });
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
        DataType::Word => match read_registers(manager, task, 1).await {
            Ok(values) => {
                if let Some(&value) = values.first() {
                    channels.publish_word(WordUpdate {
                        connection_id: task.connection_id,
                        address: task.address,
                        read_only: task.read_only,
                        value,
                    });
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
        DataType::DWord => match read_registers(manager, task, 2).await {
            Ok(values) => {
                if let [low, high] = values[..] {
                    channels.publish_dword(DwordUpdate {
                        connection_id: task.connection_id,
                        address: task.address,
                        read_only: task.read_only,
                        value: codec::decode_u32([low, high]),
                    });
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
        DataType::Float => match read_registers(manager, task, 2).await {
            Ok(values) => {
                if let [low, high] = values[..] {
                    channels.publish_float(FloatUpdate {
                        connection_id: task.connection_id,
                        address: task.address,
                        read_only: task.read_only,
                        value: codec::decode_f32([low, high]),
                    });
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        warn!(
            connection_id = task.connection_id,
            address = task.address,
            data_type = %task.data_type,
            "Poll read failed: {}",
            e
        );
    }
}

/// Read `quantity` registers from the class selected by the task's
/// read-only flag.
async fn read_registers(
    manager: &crate::manager::ConnectionManager,
    task: &TaskDefinition,
    quantity: u16,
) -> Result<Vec<u16>, BridgeError> {
    if task.read_only {
        manager
            .read_input_registers(task.connection_id, task.address, quantity)
            .await
    } else {
        manager
            .read_holding_registers(task.connection_id, task.address, quantity)
            .await
    }
}
