//! Local bookkeeping of live connection handles.
//!
//! The registry never talks to the bridge. Callers check the label
//! before asking the bridge for a connection (so a duplicate UI-level
//! attempt is rejected without any bridge call) and insert the handle
//! once the bridge has issued an id.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::{ConnectionHandle, TransportParams};

/// Tracks the set of live connection handles by transport label.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    handles: HashMap<i64, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject `params` if a live handle already carries its label.
    pub fn ensure_available(&self, params: &TransportParams) -> Result<()> {
        let label = params.label();
        if self.handles.values().any(|h| h.label == label) {
            return Err(Error::DuplicateConnection(label));
        }
        Ok(())
    }

    /// Record a handle for a freshly connected endpoint.
    ///
    /// Fails with [`Error::DuplicateConnection`] if the derived label is
    /// already live.
    pub fn create(&mut self, id: i64, params: &TransportParams) -> Result<ConnectionHandle> {
        self.ensure_available(params)?;
        let handle = ConnectionHandle {
            id,
            label: params.label(),
        };
        self.handles.insert(id, handle.clone());
        Ok(handle)
    }

    /// Drop the handle with the given id. No-op if unknown.
    pub fn remove(&mut self, id: i64) {
        self.handles.remove(&id);
    }

    /// Look up a live handle by id.
    pub fn get(&self, id: i64) -> Option<&ConnectionHandle> {
        self.handles.get(&id)
    }

    /// Iterate all live handles.
    pub fn handles(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.handles.values()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp(host: &str, port: u16) -> TransportParams {
        TransportParams::Tcp {
            host: host.to_string(),
            port,
        }
    }

    #[test]
    fn test_create_and_get() {
        let mut registry = ConnectionRegistry::new();
        let handle = registry.create(7, &tcp("10.0.0.5", 502)).unwrap();

        assert_eq!(handle.id, 7);
        assert_eq!(handle.label, "10.0.0.5:502");
        assert_eq!(registry.get(7), Some(&handle));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let mut registry = ConnectionRegistry::new();
        registry.create(1, &tcp("10.0.0.5", 502)).unwrap();

        let err = registry.create(2, &tcp("10.0.0.5", 502)).unwrap_err();
        assert!(matches!(err, Error::DuplicateConnection(label) if label == "10.0.0.5:502"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_host_different_port_allowed() {
        let mut registry = ConnectionRegistry::new();
        registry.create(1, &tcp("10.0.0.5", 502)).unwrap();
        registry.create(2, &tcp("10.0.0.5", 503)).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        registry.create(1, &tcp("10.0.0.5", 502)).unwrap();

        registry.remove(1);
        registry.remove(1);
        registry.remove(99);

        assert!(registry.is_empty());
    }

    #[test]
    fn test_label_free_after_remove() {
        let mut registry = ConnectionRegistry::new();
        registry.create(1, &tcp("10.0.0.5", 502)).unwrap();
        registry.remove(1);

        registry.create(2, &tcp("10.0.0.5", 502)).unwrap();
        assert_eq!(registry.get(2).unwrap().label, "10.0.0.5:502");
    }
}
