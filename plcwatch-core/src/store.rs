//! Address-keyed live-value store.
//!
//! The store is partitioned the way the bridge partitions its address
//! spaces: one map for coils (Bool, keyed by address), and for register
//! values one read-only map (input-register class) and one read-write map
//! (holding-register class), each keyed by address. The same numeric
//! address can legitimately exist in both register partitions at once.
//!
//! Merge rule is last-write-wins: an incoming event unconditionally
//! replaces the prior entry for its partition and address. No timestamp
//! comparison, no duplicate suppression.

use std::collections::HashMap;

use crate::types::MonitorValue;

/// Live values for one monitoring session.
#[derive(Debug, Default, Clone)]
pub struct ValueStore {
    bools: HashMap<u16, bool>,
    read_only: HashMap<u16, MonitorValue>,
    read_write: HashMap<u16, MonitorValue>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a coil update.
    pub fn merge_bool(&mut self, address: u16, value: bool) {
        self.bools.insert(address, value);
    }

    /// Merge a Word/DWord/Float update into the partition selected by
    /// `read_only`.
    pub fn merge_register(&mut self, read_only: bool, address: u16, value: MonitorValue) {
        let partition = if read_only {
            &mut self.read_only
        } else {
            &mut self.read_write
        };
        partition.insert(address, value);
    }

    /// Current coil value at `address`, if any event arrived for it.
    pub fn bool_value(&self, address: u16) -> Option<bool> {
        self.bools.get(&address).copied()
    }

    /// Current register value at `address` in the selected partition.
    pub fn register_value(&self, read_only: bool, address: u16) -> Option<MonitorValue> {
        let partition = if read_only {
            &self.read_only
        } else {
            &self.read_write
        };
        partition.get(&address).copied()
    }

    /// Iterate coil entries.
    pub fn bools(&self) -> impl Iterator<Item = (u16, bool)> + '_ {
        self.bools.iter().map(|(&a, &v)| (a, v))
    }

    /// Iterate register entries in the selected partition.
    pub fn registers(&self, read_only: bool) -> impl Iterator<Item = (u16, MonitorValue)> + '_ {
        let partition = if read_only {
            &self.read_only
        } else {
            &self.read_write
        };
        partition.iter().map(|(&a, &v)| (a, v))
    }

    /// Total number of live entries across all partitions.
    pub fn len(&self) -> usize {
        self.bools.len() + self.read_only.len() + self.read_write.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Called on teardown so no stale value survives
    /// `stop_monitor`.
    pub fn clear(&mut self) {
        self.bools.clear();
        self.read_only.clear();
        self.read_write.clear();
    }
}
