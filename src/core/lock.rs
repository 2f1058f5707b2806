//! Ordered lock handles.
//!
//! An [`OrderedLock`] binds one fair, reentrant exclusive lock to a resource
//! class. It tracks how often it was acquired and how often a bounded wait for it
//! timed out.
//!
//! # Examples
//!
//! ```
//! use prometheus_lock_order::core::{OrderedLock, ResourceClass};
//! use std::time::Duration;
//!
//! let lock = OrderedLock::new("accounts", ResourceClass::ResourceA);
//! assert!(lock.try_acquire(Duration::from_millis(10)));
//! assert!(lock.is_held_by_current_thread());
//! lock.release();
//!
//! assert_eq!(lock.total_acquisitions(), 1);
//! assert_eq!(lock.timeout_failures(), 0);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::cancel::CancellationToken;
use crate::core::error::ReleaseError;
use crate::core::fair::{AcquireOutcome, FairLock};
use crate::core::order::{next_sequence, LockKey, ResourceClass, ResourceOrder};
use crate::util::thread::thread_label;

/// A lock the coordinator can order, acquire with a bounded wait, and release.
pub trait Lockable: Sync {
    /// Diagnostic name.
    fn name(&self) -> &str;

    /// Canonical sort key.
    fn key(&self) -> LockKey;

    /// Wait up to `timeout` for exclusive ownership.
    fn try_acquire_with(&self, timeout: Duration, cancel: &CancellationToken) -> AcquireOutcome;

    /// Release one hold. Panics if the calling thread is not the owner.
    fn release(&self);

    /// Whether the calling thread owns this lock.
    fn is_held_by_current_thread(&self) -> bool;
}

/// Point-in-time counters of one lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStats {
    /// Lock name.
    pub name: String,
    /// Rank of its resource class.
    pub rank: u32,
    /// Successful acquisitions.
    pub acquisitions: u64,
    /// Acquisitions that timed out.
    pub timeouts: u64,
}

/// Longest single wait for one lock. Longer timeouts are clamped to it.
pub const MAX_LOCK_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

fn wait_deadline(now: Instant, timeout: Duration) -> Instant {
    let timeout = timeout.min(MAX_LOCK_TIMEOUT);
    now.checked_add(timeout).unwrap_or(now)
}

/// Fair, reentrant lock bound to a resource class.
pub struct OrderedLock<R: ResourceOrder = ResourceClass> {
    name: String,
    class: R,
    key: LockKey,
    inner: Arc<FairLock>,
    acquisitions: AtomicU64,
    timeouts: AtomicU64,
}

impl<R: ResourceOrder> OrderedLock<R> {
    /// Create an unlocked handle for `class`.
    pub fn new(name: impl Into<String>, class: R) -> Self {
        Self {
            name: name.into(),
            class,
            key: LockKey::new(class.rank(), next_sequence()),
            inner: Arc::new(FairLock::new()),
            acquisitions: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource class this lock belongs to.
    pub const fn class(&self) -> R {
        self.class
    }

    /// Rank of the resource class.
    pub fn rank(&self) -> u32 {
        self.key.rank
    }

    /// Canonical sort key.
    pub const fn key(&self) -> LockKey {
        self.key
    }

    /// Wait up to `timeout` for the lock.
    ///
    /// Returns `false` on timeout, holding nothing.
    pub fn try_acquire(&self, timeout: Duration) -> bool {
        self.acquire_inner(timeout, None) == AcquireOutcome::Acquired
    }

    /// Wait up to `timeout` for the lock, giving up early if `cancel` fires.
    pub fn try_acquire_with(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> AcquireOutcome {
        self.acquire_inner(timeout, Some(cancel))
    }

    fn acquire_inner(
        &self,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> AcquireOutcome {
        let deadline = wait_deadline(Instant::now(), timeout);
        let outcome = self.inner.lock_until(Some(deadline), cancel);
        match outcome {
            AcquireOutcome::Acquired => {
                self.acquisitions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(lock = %self.name, thread = %thread_label(), "acquired lock");
            }
            AcquireOutcome::TimedOut => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    lock = %self.name,
                    thread = %thread_label(),
                    timeout = ?timeout,
                    "timed out waiting for lock"
                );
            }
            AcquireOutcome::Cancelled => {
                tracing::warn!(
                    lock = %self.name,
                    thread = %thread_label(),
                    "cancelled while waiting for lock"
                );
            }
        }
        outcome
    }

    /// Release one hold.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not own the lock.
    pub fn release(&self) {
        if let Err(err) = self.try_release() {
            panic!("{err}");
        }
    }

    /// Release one hold, reporting misuse as an error.
    pub fn try_release(&self) -> Result<(), ReleaseError> {
        if self.inner.unlock() {
            tracing::debug!(lock = %self.name, thread = %thread_label(), "released lock");
            Ok(())
        } else {
            Err(ReleaseError::NotOwner(self.name.clone()))
        }
    }

    /// Whether the calling thread owns this lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.inner.is_owned_by_current_thread()
    }

    /// Whether any thread owns this lock.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Threads currently queued for this lock.
    pub fn waiting(&self) -> usize {
        self.inner.queued()
    }

    /// Successful acquisitions so far.
    pub fn total_acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Timed-out acquisitions so far.
    pub fn timeout_failures(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> LockStats {
        LockStats {
            name: self.name.clone(),
            rank: self.key.rank,
            acquisitions: self.total_acquisitions(),
            timeouts: self.timeout_failures(),
        }
    }
}

impl<R: ResourceOrder> Lockable for OrderedLock<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn key(&self) -> LockKey {
        self.key
    }

    fn try_acquire_with(&self, timeout: Duration, cancel: &CancellationToken) -> AcquireOutcome {
        Self::try_acquire_with(self, timeout, cancel)
    }

    fn release(&self) {
        Self::release(self);
    }

    fn is_held_by_current_thread(&self) -> bool {
        Self::is_held_by_current_thread(self)
    }
}

impl<R: ResourceOrder> fmt::Debug for OrderedLock<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedLock")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("key", &self.key)
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}
