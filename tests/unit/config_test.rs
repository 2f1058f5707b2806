//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use prometheus_lock_order::config::CoordinatorConfig;
use prometheus_lock_order::core::ConfigError;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let cfg = CoordinatorConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.lock_timeout_ms, 5_000);
    assert_eq!(cfg.max_attempts, 3);
    assert_eq!(cfg.backoff_base_ms, 100);
}

#[test]
fn test_config_invalid_timeout() {
    let cfg = CoordinatorConfig {
        lock_timeout_ms: 0,
        ..CoordinatorConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_timeout_upper_bound() {
    let at_limit = CoordinatorConfig {
        lock_timeout_ms: 24 * 60 * 60 * 1000,
        ..CoordinatorConfig::default()
    };
    assert!(at_limit.validate().is_ok());

    for lock_timeout_ms in [24 * 60 * 60 * 1000 + 1, u64::MAX] {
        let cfg = CoordinatorConfig {
            lock_timeout_ms,
            ..CoordinatorConfig::default()
        };
        assert!(cfg.validate().is_err(), "accepted {lock_timeout_ms}");
    }
}

#[test]
fn test_config_invalid_attempts() {
    let cfg = CoordinatorConfig {
        max_attempts: 0,
        ..CoordinatorConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_invalid_multiplier() {
    for multiplier in [0.5, f64::NAN, f64::INFINITY] {
        let cfg = CoordinatorConfig {
            backoff_multiplier: multiplier,
            ..CoordinatorConfig::default()
        };
        assert!(cfg.validate().is_err(), "accepted {multiplier}");
    }
}

#[test]
fn test_config_cap_below_base() {
    let cfg = CoordinatorConfig {
        max_backoff_ms: Some(50),
        ..CoordinatorConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "lock_timeout_ms": 2000,
        "max_attempts": 5,
        "backoff_base_ms": 50,
        "backoff_multiplier": 3.0,
        "max_backoff_ms": 1000
    }"#;

    let cfg = CoordinatorConfig::from_json_str(json).unwrap();
    let policy = cfg.to_policy();
    assert_eq!(policy.lock_timeout, Duration::from_secs(2));
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.backoff_delay(0), Duration::from_millis(50));
    assert_eq!(policy.backoff_delay(1), Duration::from_millis(150));
    assert_eq!(policy.backoff_delay(4), Duration::from_millis(1000));
}

#[test]
fn test_config_from_partial_json_keeps_defaults() {
    let cfg = CoordinatorConfig::from_json_str(r#"{ "max_attempts": 1 }"#).unwrap();
    assert_eq!(cfg.max_attempts, 1);
    assert_eq!(cfg.lock_timeout_ms, 5_000);
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(CoordinatorConfig::from_json_str(r#"{ "max_attempts": 0 }"#).is_err());
    assert!(CoordinatorConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_from_lookup() {
    let cfg = CoordinatorConfig::from_lookup(lookup(&[
        ("LOCK_ORDER_LOCK_TIMEOUT_MS", "2000"),
        ("LOCK_ORDER_MAX_ATTEMPTS", " 4 "),
        ("LOCK_ORDER_BACKOFF_MULTIPLIER", "1.5"),
    ]))
    .unwrap();

    assert_eq!(cfg.lock_timeout_ms, 2_000);
    assert_eq!(cfg.max_attempts, 4);
    assert!((cfg.backoff_multiplier - 1.5).abs() < f64::EPSILON);
    assert_eq!(cfg.backoff_base_ms, 100);
    assert_eq!(cfg.max_backoff_ms, None);
}

#[test]
fn test_config_from_lookup_rejects_garbage() {
    let err = CoordinatorConfig::from_lookup(lookup(&[("LOCK_ORDER_MAX_ATTEMPTS", "three")]))
        .unwrap_err();
    assert!(
        matches!(err, ConfigError::Env { ref name, .. } if name == "LOCK_ORDER_MAX_ATTEMPTS")
    );
}

#[test]
fn test_config_from_lookup_validates() {
    let err = CoordinatorConfig::from_lookup(lookup(&[("LOCK_ORDER_MAX_ATTEMPTS", "0")]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}
