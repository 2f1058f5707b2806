//! Cancellation for blocking lock waits and backoff sleeps.
//!
//! A [`CancellationToken`] stands in for thread interruption. Waiters register
//! themselves against the token while they block, so [`CancellationToken::cancel`]
//! wakes them immediately instead of letting them run out their timeout.
//!
//! Once cancelled, a token stays cancelled. Outer code observes the state through
//! [`CancellationToken::is_cancelled`] after the interrupted call returns.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Something blocked that can be woken by a cancellation.
pub(crate) trait Interrupt: Send + Sync {
    /// Wake every thread blocked on this object so it re-checks its token.
    fn interrupt(&self);
}

struct TokenInner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    waiters: Mutex<Vec<(u64, Arc<dyn Interrupt>)>>,
    sleep_lock: Mutex<()>,
    sleep_signal: Condvar,
}

/// Shared, clonable cancellation flag.
///
/// # Examples
///
/// ```
/// use prometheus_lock_order::core::CancellationToken;
/// use std::time::Duration;
///
/// let token = CancellationToken::new();
/// let remote = token.clone();
/// remote.cancel();
///
/// assert!(token.is_cancelled());
/// assert!(!token.sleep(Duration::from_secs(10)));
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                next_id: AtomicU64::new(0),
                waiters: Mutex::new(Vec::new()),
                sleep_lock: Mutex::new(()),
                sleep_signal: Condvar::new(),
            }),
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel and wake every registered waiter and sleeper.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        {
            let _guard = self.inner.sleep_lock.lock();
            self.inner.sleep_signal.notify_all();
        }
        let waiters = self.inner.waiters.lock();
        for (_, waiter) in waiters.iter() {
            waiter.interrupt();
        }
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if cancelled.
    #[must_use]
    pub fn sleep(&self, duration: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(duration) else {
            let mut guard = self.inner.sleep_lock.lock();
            while !self.is_cancelled() {
                self.inner.sleep_signal.wait(&mut guard);
            }
            return false;
        };
        let mut guard = self.inner.sleep_lock.lock();
        loop {
            if self.is_cancelled() {
                return false;
            }
            if self
                .inner
                .sleep_signal
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                return !self.is_cancelled();
            }
        }
    }

    /// Register a blocked waiter. It is removed when the returned guard drops.
    pub(crate) fn register(&self, waiter: Arc<dyn Interrupt>) -> Registration<'_> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.waiters.lock().push((id, waiter));
        Registration { token: self, id }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Live registration of a waiter on a token.
pub(crate) struct Registration<'a> {
    token: &'a CancellationToken,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.token
            .inner
            .waiters
            .lock()
            .retain(|(id, _)| *id != self.id);
    }
}
