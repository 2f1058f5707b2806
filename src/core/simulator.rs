//! Two threads asking for the same pair of locks in opposite orders.
//!
//! Taking `lock1` then `lock2` on one thread and `lock2` then `lock1` on another
//! is the textbook deadlock. Routed through the coordinator, both requests are
//! taken as (`lock1`, `lock2`) and the pair can never deadlock.

use std::sync::Arc;

use crate::core::audit::AuditSink;
use crate::core::coordinator::{AcquirePolicy, LockCoordinator};
use crate::core::error::AcquireError;
use crate::core::lock::{LockStats, OrderedLock};
use crate::core::order::ResourceClass;

/// Shared pair of locks plus the coordinator guarding them.
#[derive(Debug)]
pub struct DeadlockSimulator {
    lock1: OrderedLock<ResourceClass>,
    lock2: OrderedLock<ResourceClass>,
    coordinator: LockCoordinator,
}

impl DeadlockSimulator {
    /// Create the pair with the given policy.
    pub fn new(policy: AcquirePolicy) -> Self {
        Self::with_coordinator(LockCoordinator::new(policy))
    }

    /// Create the pair and audit every lock event to `sink`.
    pub fn with_audit(policy: AcquirePolicy, sink: Arc<dyn AuditSink>) -> Self {
        Self::with_coordinator(LockCoordinator::new(policy).with_audit(sink))
    }

    fn with_coordinator(coordinator: LockCoordinator) -> Self {
        Self {
            lock1: OrderedLock::new("lock1", ResourceClass::ResourceA),
            lock2: OrderedLock::new("lock2", ResourceClass::ResourceB),
            coordinator,
        }
    }

    /// `lock1` (rank 1).
    pub const fn lock1(&self) -> &OrderedLock<ResourceClass> {
        &self.lock1
    }

    /// `lock2` (rank 2).
    pub const fn lock2(&self) -> &OrderedLock<ResourceClass> {
        &self.lock2
    }

    /// Request (`lock1`, `lock2`), do the critical section, release.
    ///
    /// Returns the names in the order they were actually taken.
    pub fn run_forward(&self) -> Result<Vec<String>, AcquireError> {
        self.run(&[self.lock1(), self.lock2()], "forward")
    }

    /// Request (`lock2`, `lock1`), do the critical section, release.
    ///
    /// Returns the names in the order they were actually taken.
    pub fn run_reverse(&self) -> Result<Vec<String>, AcquireError> {
        self.run(&[self.lock2(), self.lock1()], "reverse")
    }

    fn run(
        &self,
        request: &[&OrderedLock<ResourceClass>],
        label: &str,
    ) -> Result<Vec<String>, AcquireError> {
        let held = self.coordinator.acquire_all(request).map_err(|err| {
            tracing::error!(path = label, error = %err, "failed to acquire locks");
            err
        })?;
        let taken: Vec<String> = held.names().map(ToOwned::to_owned).collect();
        tracing::debug!(path = label, order = ?taken, "acquired lock1 and lock2");
        self.coordinator.release_all(held);
        Ok(taken)
    }

    /// Counter snapshot of both locks.
    pub fn metrics(&self) -> Vec<LockStats> {
        vec![self.lock1.stats(), self.lock2.stats()]
    }

    /// Log the counters of both locks.
    pub fn log_metrics(&self) {
        for stats in self.metrics() {
            tracing::debug!(
                lock = %stats.name,
                acquisitions = stats.acquisitions,
                timeouts = stats.timeouts,
                "lock metrics"
            );
        }
    }
}
