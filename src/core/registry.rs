//! Process-wide set of ordered locks.
//!
//! The registry is built once at startup, owns one [`OrderedLock`] per resource
//! class, and is passed by reference to every call site that needs locks.

use std::fmt;

use crate::core::error::OrderError;
use crate::core::lock::{LockStats, OrderedLock};
use crate::core::order::{validate_order, ResourceOrder};

/// One lock per class of `R`, in rank order.
pub struct LockRegistry<R: ResourceOrder> {
    locks: Vec<OrderedLock<R>>,
}

impl<R: ResourceOrder> LockRegistry<R> {
    /// Validate `R` and create a lock named after each class label.
    pub fn new() -> Result<Self, OrderError> {
        Self::with_names(|class| class.label().to_string())
    }

    /// Validate `R` and create a lock per class, named by `name_of`.
    pub fn with_names<F>(mut name_of: F) -> Result<Self, OrderError>
    where
        F: FnMut(R) -> String,
    {
        validate_order::<R>()?;
        let mut classes = R::ALL.to_vec();
        classes.sort_by_key(|class| class.rank());
        let locks = classes
            .into_iter()
            .map(|class| OrderedLock::new(name_of(class), class))
            .collect();
        Ok(Self { locks })
    }

    /// Lock for `class`, if `class` is listed in `R::ALL`.
    pub fn get(&self, class: R) -> Option<&OrderedLock<R>> {
        self.locks.iter().find(|lock| lock.class() == class)
    }

    /// All locks in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &OrderedLock<R>> {
        self.locks.iter()
    }

    /// Number of locks.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether the registry holds no locks.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Counter snapshot of every lock.
    pub fn stats(&self) -> Vec<LockStats> {
        self.locks.iter().map(OrderedLock::stats).collect()
    }

    /// Log the counters of every lock.
    pub fn log_metrics(&self) {
        for stats in self.stats() {
            tracing::info!(
                lock = %stats.name,
                rank = stats.rank,
                acquisitions = stats.acquisitions,
                timeouts = stats.timeouts,
                "lock metrics"
            );
        }
    }
}

impl<R: ResourceOrder> fmt::Debug for LockRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.locks.iter()).finish()
    }
}
