//! Tests for the lock registry

use std::time::Duration;

use prometheus_lock_order::core::{LockRegistry, OrderError, ResourceOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clashing {
    Orders,
    Payments,
}

impl ResourceOrder for Clashing {
    const ALL: &'static [Self] = &[Self::Orders, Self::Payments];

    fn rank(self) -> u32 {
        5
    }

    fn label(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Payments => "payments",
        }
    }
}

#[test]
fn test_registry_rejects_clashing_ranks() {
    let err = LockRegistry::<Clashing>::new().unwrap_err();
    assert_eq!(
        err,
        OrderError::DuplicateRank {
            rank: 5,
            first: "orders",
            second: "payments",
        }
    );
}

#[test]
fn test_registry_stats_track_locks() {
    let registry = LockRegistry::<prometheus_lock_order::core::ResourceClass>::new().unwrap();
    for lock in registry.iter() {
        assert!(lock.try_acquire(Duration::ZERO));
        lock.release();
    }
    registry.log_metrics();

    let stats = registry.stats();
    assert!(stats.iter().all(|s| s.acquisitions == 1 && s.timeouts == 0));
}
