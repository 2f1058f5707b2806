//! Tests for builders

use std::sync::Arc;
use std::time::Duration;

use prometheus_lock_order::builders::build_coordinator;
use prometheus_lock_order::config::CoordinatorConfig;
use prometheus_lock_order::core::{
    ConfigError, InMemoryAuditSink, LockAction, OrderedLock, ResourceClass,
};

#[test]
fn test_build_coordinator_applies_policy() {
    let cfg = CoordinatorConfig {
        lock_timeout_ms: 250,
        max_attempts: 2,
        ..CoordinatorConfig::default()
    };
    let coordinator = build_coordinator(&cfg, None).unwrap();
    assert_eq!(coordinator.policy().lock_timeout, Duration::from_millis(250));
    assert_eq!(coordinator.policy().max_attempts, 2);
}

#[test]
fn test_build_coordinator_rejects_invalid_config() {
    let cfg = CoordinatorConfig {
        max_attempts: 0,
        ..CoordinatorConfig::default()
    };
    assert!(matches!(
        build_coordinator(&cfg, None),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_build_coordinator_with_audit() {
    let sink = Arc::new(InMemoryAuditSink::new(16));
    let coordinator = build_coordinator(&CoordinatorConfig::default(), Some(sink.clone())).unwrap();

    let lock = OrderedLock::new("audited", ResourceClass::ResourceA);
    coordinator.release_all(coordinator.acquire_all(&[&lock]).unwrap());

    let actions: Vec<LockAction> = sink.events().into_iter().map(|e| e.action).collect();
    assert_eq!(actions, [LockAction::Acquired, LockAction::Released]);
}
