//! # Prometheus Lock Order
//!
//! Deadlock-free acquisition of several exclusive locks as one unit.
//!
//! Services on the Prometheus AI Platform regularly need more than one shared
//! resource at a time (a catalog row and an index segment, two accounts, a
//! queue and its cache). When two threads ask for overlapping resources in
//! different orders, naive locking deadlocks. This crate prevents that by
//! construction rather than by detection.
//!
//! ## How It Works
//!
//! - **Global order**: every resource class has a unique rank ([`core::ResourceOrder`])
//! - **Canonical acquisition**: requests are sorted by rank before locking, so
//!   circular wait cannot occur whatever order the caller listed them in
//! - **Bounded waits**: each lock is waited for with a timeout
//! - **Rollback**: a failed attempt releases everything it took, in reverse order
//! - **Retry with backoff**: a bounded number of attempts, exponentially spaced
//! - **Fair locks**: waiters are served in arrival order and may re-enter
//!
//! ## Usage
//!
//! ```rust
//! use prometheus_lock_order::core::{LockCoordinator, OrderedLock, ResourceClass};
//! use prometheus_lock_order::config::CoordinatorConfig;
//!
//! let accounts = OrderedLock::new("accounts", ResourceClass::ResourceA);
//! let ledger = OrderedLock::new("ledger", ResourceClass::ResourceB);
//!
//! let coordinator = LockCoordinator::new(CoordinatorConfig::default().to_policy());
//!
//! match coordinator.acquire_all(&[&ledger, &accounts]) {
//!     Ok(held) => {
//!         // critical section over both resources
//!         coordinator.release_all(held);
//!     }
//!     Err(err) => eprintln!("contention, try later: {err}"),
//! };
//! ```
//!
//! A failure always means nothing is held. Treat it as an expected outcome under
//! contention, not as a crash.
//!
//! For complete scenarios, see:
//! - `tests/coordinator_test.rs` - ordering, rollback, retry and cancellation
//! - `tests/deadlock_freedom_test.rs` - reversed-pair and permuted-subset stress runs

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Lock ordering, lock handles, and the acquisition coordinator.
pub mod core;
/// Configuration models for timeouts, retries and backoff.
pub mod config;
/// Builders to construct coordinators from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
