//! Tests for error types

use prometheus_lock_order::core::{AcquireError, ConfigError, OrderError, ReleaseError};

#[test]
fn test_exhausted_error() {
    let err = AcquireError::Exhausted { attempts: 3, locks: 2 };
    assert_eq!(format!("{}", err), "failed to acquire 2 locks after 3 attempts");
}

#[test]
fn test_cancelled_error() {
    assert_eq!(format!("{}", AcquireError::Cancelled), "lock acquisition cancelled");
}

#[test]
fn test_duplicate_lock_error() {
    let err = AcquireError::DuplicateLock("lock1".to_string());
    assert_eq!(format!("{}", err), "duplicate lock `lock1` in acquisition request");
}

#[test]
fn test_order_errors() {
    assert_eq!(format!("{}", OrderError::Empty), "resource order declares no classes");
    let err = OrderError::DuplicateRank {
        rank: 4,
        first: "catalog",
        second: "index",
    };
    assert_eq!(format!("{}", err), "rank 4 shared by `catalog` and `index`");
}

#[test]
fn test_release_error() {
    let err = ReleaseError::NotOwner("lock2".to_string());
    assert_eq!(
        format!("{}", err),
        "lock `lock2` released by a thread that does not own it"
    );
}

#[test]
fn test_config_errors() {
    let err = ConfigError::Env {
        name: "LOCK_ORDER_MAX_ATTEMPTS".to_string(),
        reason: "invalid digit found in string".to_string(),
    };
    assert_eq!(
        format!("{}", err),
        "environment variable `LOCK_ORDER_MAX_ATTEMPTS`: invalid digit found in string"
    );
    let err = ConfigError::Invalid("max_attempts must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: max_attempts must be greater than 0"
    );
}
