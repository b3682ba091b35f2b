//! Integration tests driving the full monitor lifecycle over the mock
//! bridge.

use std::sync::Arc;
use std::time::Duration;

use plcwatch_core::mock::{MockBridge, WriteCall};
use plcwatch_core::{
    DataType, Error, MonitorItem, MonitorSession, MonitorValue, SharedStore, TransportParams,
};

fn tcp(host: &str, port: u16) -> TransportParams {
    TransportParams::Tcp {
        host: host.to_string(),
        port,
    }
}

/// Poll the store until `predicate` holds or a timeout expires.
async fn wait_for<F>(store: &SharedStore, predicate: F)
where
    F: Fn(&plcwatch_core::ValueStore) -> bool,
{
    for _ in 0..200 {
        if predicate(&*store.read().await) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("store never reached expected state");
}

#[tokio::test]
async fn test_full_monitor_lifecycle() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());

    let handle = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();
    assert_eq!(handle.label, "10.0.0.5:502");

    let items = [
        MonitorItem::new(0, DataType::Bool, false),
        MonitorItem::new(10, DataType::Word, false),
        MonitorItem::new(20, DataType::Float, true),
    ];
    session.start_monitor(handle.id, &items, 1000).await.unwrap();
    assert_eq!(bridge.registered_tasks().await.len(), 3);

    let store = session.store();
    bridge.push_bool(handle.id, 0, true);
    bridge.push_word(handle.id, 10, false, 4711);
    bridge.push_float(handle.id, 20, true, 21.5);

    wait_for(&store, |s| s.len() == 3).await;
    let values = session.values().await;
    assert_eq!(values.bool_value(0), Some(true));
    assert_eq!(
        values.register_value(false, 10),
        Some(MonitorValue::Word(4711))
    );
    assert_eq!(
        values.register_value(true, 20),
        Some(MonitorValue::Float(21.5))
    );

    session.stop_monitor().await;
    assert!(session.values().await.is_empty());
    assert!(bridge.registered_tasks().await.is_empty());
}

#[tokio::test]
async fn test_last_event_wins() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());
    let handle = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();

    let items = [MonitorItem::new(10, DataType::DWord, false)];
    session.start_monitor(handle.id, &items, 1000).await.unwrap();

    let store = session.store();
    for v in [1u32, 2, 3, 100_000] {
        bridge.push_dword(handle.id, 10, false, v);
    }

    wait_for(&store, |s| {
        s.register_value(false, 10) == Some(MonitorValue::DWord(100_000))
    })
    .await;
    assert_eq!(session.values().await.len(), 1);
}

#[tokio::test]
async fn test_read_only_axis_yields_distinct_entries() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());
    let handle = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();

    // Same numeric address in both register classes.
    let items = [
        MonitorItem::new(100, DataType::Word, false),
        MonitorItem::new(100, DataType::Word, true),
    ];
    session.start_monitor(handle.id, &items, 1000).await.unwrap();
    assert_eq!(bridge.registered_tasks().await.len(), 2);

    let store = session.store();
    bridge.push_word(handle.id, 100, false, 1);
    bridge.push_word(handle.id, 100, true, 2);

    wait_for(&store, |s| s.len() == 2).await;
    let values = session.values().await;
    assert_eq!(
        values.register_value(false, 100),
        Some(MonitorValue::Word(1))
    );
    assert_eq!(values.register_value(true, 100), Some(MonitorValue::Word(2)));
}

#[tokio::test]
async fn test_events_for_other_connections_are_filtered() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());
    let handle = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();

    let items = [MonitorItem::new(10, DataType::Word, false)];
    session.start_monitor(handle.id, &items, 1000).await.unwrap();

    let store = session.store();
    bridge.push_word(handle.id + 1, 10, false, 999);
    bridge.push_word(handle.id, 10, false, 42);

    wait_for(&store, |s| s.len() == 1).await;
    assert_eq!(
        session.values().await.register_value(false, 10),
        Some(MonitorValue::Word(42))
    );
}

#[tokio::test]
async fn test_events_after_stop_are_ignored() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());
    let handle = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();

    let items = [MonitorItem::new(10, DataType::Word, false)];
    session.start_monitor(handle.id, &items, 1000).await.unwrap();

    let store = session.store();
    bridge.push_word(handle.id, 10, false, 1);
    wait_for(&store, |s| s.len() == 1).await;

    session.stop_monitor().await;
    assert!(session.values().await.is_empty());

    // Post-teardown events must not re-populate the store.
    bridge.push_word(handle.id, 10, false, 2);
    bridge.push_bool(handle.id, 0, true);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.values().await.is_empty());
}

#[tokio::test]
async fn test_stop_monitor_is_idempotent() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());

    // No active items: a no-op, not an error.
    session.stop_monitor().await;
    session.stop_monitor().await;
    assert!(session.values().await.is_empty());
}

#[tokio::test]
async fn test_fail_fast_batch_keeps_earlier_registrations() {
    let bridge = Arc::new(MockBridge::new());
    bridge.reject_address(50).await;

    let mut session = MonitorSession::new(bridge.clone());
    let handle = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();

    let items = [
        MonitorItem::new(10, DataType::Word, false),
        MonitorItem::new(50, DataType::Word, false),
        MonitorItem::new(60, DataType::Word, false),
    ];
    let err = session
        .start_monitor(handle.id, &items, 1000)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Registration { address: 50, .. }));

    // Item 10 registered, 50 rejected, 60 never attempted.
    let tasks = bridge.registered_tasks().await;
    assert_eq!(tasks.len(), 1);
    assert!(tasks.contains(&(handle.id, 10, DataType::Word, false)));

    // Explicit stop cleans up the partial state.
    session.stop_monitor().await;
    assert!(bridge.registered_tasks().await.is_empty());
}

#[tokio::test]
async fn test_unregister_item_is_idempotent() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());
    let handle = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();

    let items = [MonitorItem::new(10, DataType::Word, false)];
    session.start_monitor(handle.id, &items, 1000).await.unwrap();

    session
        .unregister_item(handle.id, 10, DataType::Word, false)
        .await;
    assert!(bridge.registered_tasks().await.is_empty());

    // Second removal, and removal of a never-registered key: no panic,
    // no state change.
    session
        .unregister_item(handle.id, 10, DataType::Word, false)
        .await;
    session
        .unregister_item(handle.id, 999, DataType::Float, true)
        .await;
    assert!(bridge.registered_tasks().await.is_empty());
}

#[tokio::test]
async fn test_duplicate_connection_rejected_before_bridge_call() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());

    session.connect(&tcp("10.0.0.5", 502)).await.unwrap();
    let err = session.connect(&tcp("10.0.0.5", 502)).await.unwrap_err();

    assert!(matches!(err, Error::DuplicateConnection(label) if label == "10.0.0.5:502"));
    // The bridge only ever saw the first request.
    assert_eq!(bridge.connection_count().await, 1);
}

#[tokio::test]
async fn test_disconnect_stops_monitoring_and_frees_label() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());
    let handle = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();

    let items = [MonitorItem::new(10, DataType::Word, false)];
    session.start_monitor(handle.id, &items, 1000).await.unwrap();

    session.disconnect(handle.id).await;
    assert!(session.values().await.is_empty());
    assert!(bridge.registered_tasks().await.is_empty());
    assert_eq!(bridge.connection_count().await, 0);
    assert!(session.monitored_connection().is_none());

    // Label usable again.
    session.connect(&tcp("10.0.0.5", 502)).await.unwrap();
}

#[tokio::test]
async fn test_switching_connections_stops_previous_monitor() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());
    let first = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();
    let second = session.connect(&tcp("10.0.0.6", 502)).await.unwrap();

    let items = [MonitorItem::new(10, DataType::Word, false)];
    session.start_monitor(first.id, &items, 1000).await.unwrap();

    let store = session.store();
    bridge.push_word(first.id, 10, false, 1);
    wait_for(&store, |s| s.len() == 1).await;

    // Switching tears the first monitor down before the second starts.
    session.start_monitor(second.id, &items, 1000).await.unwrap();
    assert_eq!(session.monitored_connection(), Some(second.id));
    let tasks = bridge.registered_tasks().await;
    assert_eq!(tasks.len(), 1);
    assert!(tasks.contains(&(second.id, 10, DataType::Word, false)));

    // The first connection's events no longer reach the store.
    bridge.push_word(first.id, 10, false, 99);
    bridge.push_word(second.id, 10, false, 7);
    wait_for(&store, |s| {
        s.register_value(false, 10) == Some(MonitorValue::Word(7))
    })
    .await;
    assert_eq!(session.values().await.len(), 1);

    // Disconnecting the first connection leaves the second monitored.
    session.disconnect(first.id).await;
    assert_eq!(session.monitored_connection(), Some(second.id));
}

#[tokio::test]
async fn test_write_word_wraps_to_16_bits() {
    let bridge = Arc::new(MockBridge::new());
    let session = MonitorSession::new(bridge.clone());

    let confirmation = session
        .write_value(1, 10, DataType::Word, "70000")
        .await
        .unwrap();
    assert_eq!(confirmation.address, 10);
    assert_eq!(confirmation.value, MonitorValue::Word(70000u32 as u16));

    assert_eq!(
        bridge.writes().await,
        vec![WriteCall::Single {
            connection_id: 1,
            address: 10,
            value: 70000u32 as u16,
        }]
    );
}

#[tokio::test]
async fn test_write_dword_encodes_low_word_first() {
    let bridge = Arc::new(MockBridge::new());
    let session = MonitorSession::new(bridge.clone());

    session
        .write_value(1, 20, DataType::DWord, "305419896") // 0x12345678
        .await
        .unwrap();

    assert_eq!(
        bridge.writes().await,
        vec![WriteCall::Multiple {
            connection_id: 1,
            address: 20,
            values: vec![0x5678, 0x1234],
        }]
    );
}

#[tokio::test]
async fn test_write_float_roundtrips_through_codec() {
    let bridge = Arc::new(MockBridge::new());
    let session = MonitorSession::new(bridge.clone());

    session
        .write_value(1, 30, DataType::Float, "123.456")
        .await
        .unwrap();

    let writes = bridge.writes().await;
    match &writes[..] {
        [WriteCall::Multiple { values, .. }] => {
            assert_eq!(values, &[0xE979, 0x42F6]);
        }
        other => panic!("unexpected writes: {:?}", other),
    }
}

#[tokio::test]
async fn test_write_bool_literal_rule() {
    let bridge = Arc::new(MockBridge::new());
    let session = MonitorSession::new(bridge.clone());

    for (literal, expected) in [
        ("true", true),
        ("True", true),
        ("TRUE", true),
        ("false", false),
        ("yes", false),
        ("1", false),
        ("", false),
    ] {
        session
            .write_value(1, 0, DataType::Bool, literal)
            .await
            .unwrap();
        match bridge.writes().await.last() {
            Some(WriteCall::Coil { value, .. }) => assert_eq!(*value, expected, "{:?}", literal),
            other => panic!("unexpected write: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_write_parse_failure_issues_no_bridge_call() {
    let bridge = Arc::new(MockBridge::new());
    let session = MonitorSession::new(bridge.clone());

    let err = session
        .write_value(1, 10, DataType::Word, "not-a-number")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
    assert!(bridge.writes().await.is_empty());
}

#[tokio::test]
async fn test_write_error_surfaces_bridge_message_verbatim() {
    let bridge = Arc::new(MockBridge::new());
    bridge.reject_writes("Illegal data address").await;
    let session = MonitorSession::new(bridge.clone());

    let err = session
        .write_value(1, 10, DataType::Word, "1")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Illegal data address"));
}

#[tokio::test]
async fn test_write_does_not_touch_the_store() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());
    let handle = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();

    let items = [MonitorItem::new(10, DataType::Word, false)];
    session.start_monitor(handle.id, &items, 1000).await.unwrap();

    session
        .write_value(handle.id, 10, DataType::Word, "5")
        .await
        .unwrap();

    // Writes never update the cache; the next poll cycle does.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.values().await.is_empty());
}

#[tokio::test]
async fn test_on_demand_reads() {
    let bridge = Arc::new(MockBridge::new());
    bridge.set_holding_register(5, 1234).await;
    bridge.set_input_register(5, 4321).await;

    let mut session = MonitorSession::new(bridge.clone());
    let handle = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();

    assert_eq!(
        session.read_holding_registers(handle.id, 5, 1).await.unwrap(),
        vec![1234]
    );
    assert_eq!(
        session.read_input_registers(handle.id, 5, 1).await.unwrap(),
        vec![4321]
    );
    assert_eq!(
        session.read_coils(handle.id, 0, 2).await.unwrap(),
        vec![false, false]
    );
}

#[tokio::test]
async fn test_reads_and_writes_at_top_of_address_space() {
    let bridge = Arc::new(MockBridge::new());
    let mut session = MonitorSession::new(bridge.clone());
    let handle = session.connect(&tcp("10.0.0.5", 502)).await.unwrap();

    // A two-register span starting at the last address must not panic.
    assert_eq!(
        session
            .read_coils(handle.id, u16::MAX, 2)
            .await
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        session
            .read_holding_registers(handle.id, u16::MAX, 2)
            .await
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        session
            .read_input_registers(handle.id, u16::MAX, 2)
            .await
            .unwrap()
            .len(),
        2
    );

    // DWord writes span two registers; issuing one at the last address
    // must not panic either.
    session
        .write_value(handle.id, u16::MAX, DataType::DWord, "1")
        .await
        .unwrap();
    assert_eq!(
        bridge.writes().await,
        vec![WriteCall::Multiple {
            connection_id: handle.id,
            address: u16::MAX,
            values: vec![1, 0],
        }]
    );
}
