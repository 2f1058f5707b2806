//! Tests for audit sinks

use prometheus_lock_order::core::{build_audit_event, AuditSink, InMemoryAuditSink, LockAction};

#[test]
fn test_build_audit_event() {
    let event = build_audit_event("lock1", LockAction::Acquired, 2);
    assert_eq!(event.lock, "lock1");
    assert_eq!(event.action, LockAction::Acquired);
    assert_eq!(event.attempt, 2);
    assert!(!event.event_id.is_empty());
    assert!(!event.thread.is_empty());
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_in_memory_sink_is_bounded() {
    let sink = InMemoryAuditSink::new(3);
    for attempt in 1..=5 {
        sink.record(build_audit_event("lock1", LockAction::TimedOut, attempt));
    }

    let attempts: Vec<u32> = sink.events().iter().map(|e| e.attempt).collect();
    assert_eq!(attempts, [3, 4, 5]);

    sink.clear();
    assert!(sink.events().is_empty());
}

#[test]
fn test_events_for_thread() {
    let sink = InMemoryAuditSink::new(8);
    sink.record(build_audit_event("main", LockAction::Acquired, 1));
    let event = std::thread::Builder::new()
        .name("audit-worker".into())
        .spawn(|| build_audit_event("worker", LockAction::Released, 0))
        .unwrap()
        .join()
        .unwrap();
    sink.record(event);

    let worker = sink.events_for_thread("audit-worker");
    assert_eq!(worker.len(), 1);
    assert_eq!(worker[0].lock, "worker");
}

#[test]
fn test_lock_action_serializes_snake_case() {
    let json = serde_json::to_string(&LockAction::RolledBack).unwrap();
    assert_eq!(json, "\"rolled_back\"");
}
