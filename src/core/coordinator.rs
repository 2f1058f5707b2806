//! Deadlock-free acquisition of several locks as one unit.
//!
//! The coordinator sorts every request into the canonical order given by each
//! lock's [`LockKey`](crate::core::LockKey) and takes the locks one by one with a
//! bounded wait. Since every caller sorts the same way, no two threads can each
//! wait on a lock the other holds: circular wait is impossible no matter how the
//! caller listed the locks.
//!
//! A failed attempt releases everything it took, in reverse order, before the
//! next attempt. Attempts are separated by an exponentially growing backoff.
//! After the configured number of attempts the call fails holding nothing.
//!
//! A thread that holds locks obtained here must not take further locks from the
//! same set outside the coordinator.
//!
//! # Examples
//!
//! ```
//! use prometheus_lock_order::core::{AcquirePolicy, LockCoordinator, OrderedLock, ResourceClass};
//!
//! let a = OrderedLock::new("lock1", ResourceClass::ResourceA);
//! let b = OrderedLock::new("lock2", ResourceClass::ResourceB);
//! let coordinator = LockCoordinator::new(AcquirePolicy::default());
//!
//! // Listed in reverse, taken as (lock1, lock2).
//! let held = coordinator.acquire_all(&[&b, &a]).unwrap();
//! let names: Vec<&str> = held.names().collect();
//! assert_eq!(names, ["lock1", "lock2"]);
//! coordinator.release_all(held);
//!
//! assert!(!a.is_locked() && !b.is_locked());
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::core::audit::{build_audit_event, AuditSink, LockAction};
use crate::core::cancel::CancellationToken;
use crate::core::error::AcquireError;
use crate::core::fair::AcquireOutcome;
use crate::core::lock::Lockable;
use crate::util::thread::thread_label;

/// Longest single backoff sleep of a policy without `max_backoff`.
pub const BACKOFF_CEILING: Duration = Duration::from_secs(60 * 60);

/// Timeout, retry and backoff settings for the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquirePolicy {
    /// Bounded wait for each single lock.
    pub lock_timeout: Duration,
    /// Total attempts before giving up. At least one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub backoff_base: Duration,
    /// Growth factor of the delay between successive attempts.
    pub backoff_multiplier: f64,
    /// Upper bound on a single delay.
    pub max_backoff: Option<Duration>,
}

impl Default for AcquirePolicy {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            max_attempts: 3,
            backoff_base: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_backoff: None,
        }
    }
}

impl AcquirePolicy {
    /// Delay to sleep after failed attempt number `retry + 1` (0-indexed).
    ///
    /// Never longer than `max_backoff`, or [`BACKOFF_CEILING`] when no cap is
    /// set. A negative or NaN growth yields no delay at all.
    #[must_use]
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let ceiling = self.max_backoff.unwrap_or(BACKOFF_CEILING);
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.backoff_base.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).map_or(ceiling, |delay| delay.min(ceiling))
    }

    /// Sum of every backoff delay a fully failing call sleeps through.
    #[must_use]
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|retry| self.backoff_delay(retry))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Sort a request into canonical order, rejecting duplicates.
pub fn canonical_order<'a, L>(handles: &[&'a L]) -> Result<Vec<&'a L>, AcquireError>
where
    L: Lockable + ?Sized,
{
    let mut ordered = handles.to_vec();
    ordered.sort_by_key(|lock| lock.key());
    if let Some(pair) = ordered.windows(2).find(|pair| pair[0].key() == pair[1].key()) {
        return Err(AcquireError::DuplicateLock(pair[1].name().to_owned()));
    }
    Ok(ordered)
}

/// Locks taken so far by one attempt. Anything still here on drop is rolled back.
struct Attempt<'a, 's, L: Lockable + ?Sized> {
    held: Vec<&'a L>,
    number: u32,
    audit: Option<&'s Arc<dyn AuditSink>>,
}

impl<'a, 's, L: Lockable + ?Sized> Attempt<'a, 's, L> {
    fn new(capacity: usize, number: u32, audit: Option<&'s Arc<dyn AuditSink>>) -> Self {
        Self {
            held: Vec::with_capacity(capacity),
            number,
            audit,
        }
    }

    fn commit(mut self) -> Vec<&'a L> {
        std::mem::take(&mut self.held)
    }
}

impl<L: Lockable + ?Sized> Drop for Attempt<'_, '_, L> {
    fn drop(&mut self) {
        while let Some(lock) = self.held.pop() {
            lock.release();
            if let Some(sink) = self.audit {
                sink.record(build_audit_event(lock.name(), LockAction::RolledBack, self.number));
            }
        }
    }
}

enum AttemptOutcome<'a, L: ?Sized> {
    Acquired(Vec<&'a L>),
    TimedOut,
    Cancelled,
}

/// Acquires sets of locks in canonical order with rollback and retry.
#[derive(Clone)]
pub struct LockCoordinator {
    policy: AcquirePolicy,
    audit: Option<Arc<dyn AuditSink>>,
}

impl LockCoordinator {
    /// Create a coordinator with the given policy.
    pub fn new(policy: AcquirePolicy) -> Self {
        Self { policy, audit: None }
    }

    /// Record lock lifecycle events to `sink`.
    #[must_use]
    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Active policy.
    pub const fn policy(&self) -> &AcquirePolicy {
        &self.policy
    }

    /// Acquire every lock in `handles` or none of them.
    pub fn acquire_all<'a, L>(&self, handles: &[&'a L]) -> Result<LockSet<'a, L>, AcquireError>
    where
        L: Lockable + ?Sized,
    {
        self.acquire_all_cancellable(handles, &CancellationToken::new())
    }

    /// Like [`acquire_all`](Self::acquire_all), abandoning the call as soon as
    /// `cancel` fires. The token stays cancelled afterwards.
    pub fn acquire_all_cancellable<'a, L>(
        &self,
        handles: &[&'a L],
        cancel: &CancellationToken,
    ) -> Result<LockSet<'a, L>, AcquireError>
    where
        L: Lockable + ?Sized,
    {
        let ordered = canonical_order(handles)?;
        if ordered.is_empty() {
            return Ok(LockSet::new(ordered, self.audit.clone()));
        }

        let thread = thread_label();
        let max_attempts = self.policy.max_attempts.max(1);
        debug!(
            thread = %thread,
            count = ordered.len(),
            order = ?ordered.iter().map(|l| l.name()).collect::<Vec<_>>(),
            "acquiring locks in canonical order"
        );

        for attempt in 1..=max_attempts {
            match self.run_attempt(&ordered, attempt, cancel) {
                AttemptOutcome::Acquired(held) => {
                    debug!(thread = %thread, count = held.len(), attempt, "acquired all locks");
                    return Ok(LockSet::new(held, self.audit.clone()));
                }
                AttemptOutcome::Cancelled => {
                    warn!(thread = %thread, attempt, "lock acquisition cancelled");
                    self.record_request(&ordered, LockAction::Cancelled, attempt);
                    return Err(AcquireError::Cancelled);
                }
                AttemptOutcome::TimedOut => {}
            }

            if attempt < max_attempts {
                let delay = self.policy.backoff_delay(attempt - 1);
                debug!(
                    thread = %thread,
                    attempt,
                    delay = ?delay,
                    "backing off before retry"
                );
                self.record_request(&ordered, LockAction::BackedOff, attempt);
                if !cancel.sleep(delay) {
                    warn!(thread = %thread, attempt, "cancelled during backoff");
                    self.record_request(&ordered, LockAction::Cancelled, attempt);
                    return Err(AcquireError::Cancelled);
                }
            }
        }

        error!(
            thread = %thread,
            attempts = max_attempts,
            count = ordered.len(),
            "failed to acquire all locks"
        );
        self.record_request(&ordered, LockAction::Exhausted, max_attempts);
        Err(AcquireError::Exhausted {
            attempts: max_attempts,
            locks: ordered.len(),
        })
    }

    /// Release a set obtained from [`acquire_all`](Self::acquire_all), in reverse order.
    pub fn release_all<L: Lockable + ?Sized>(&self, set: LockSet<'_, L>) {
        set.release();
    }

    fn run_attempt<'a, L>(
        &self,
        ordered: &[&'a L],
        number: u32,
        cancel: &CancellationToken,
    ) -> AttemptOutcome<'a, L>
    where
        L: Lockable + ?Sized,
    {
        let mut attempt = Attempt::new(ordered.len(), number, self.audit.as_ref());
        for lock in ordered {
            match lock.try_acquire_with(self.policy.lock_timeout, cancel) {
                AcquireOutcome::Acquired => {
                    attempt.held.push(*lock);
                    self.record(lock.name(), LockAction::Acquired, number);
                }
                AcquireOutcome::TimedOut => {
                    warn!(
                        lock = lock.name(),
                        attempt = number,
                        max_attempts = self.policy.max_attempts,
                        rolled_back = attempt.held.len(),
                        "failed to acquire lock, rolling back attempt"
                    );
                    self.record(lock.name(), LockAction::TimedOut, number);
                    return AttemptOutcome::TimedOut;
                }
                AcquireOutcome::Cancelled => return AttemptOutcome::Cancelled,
            }
        }
        AttemptOutcome::Acquired(attempt.commit())
    }

    fn record(&self, lock: &str, action: LockAction, attempt: u32) {
        if let Some(sink) = &self.audit {
            sink.record(build_audit_event(lock, action, attempt));
        }
    }

    fn record_request<L>(&self, ordered: &[&L], action: LockAction, attempt: u32)
    where
        L: Lockable + ?Sized,
    {
        if self.audit.is_some() {
            let names: Vec<&str> = ordered.iter().map(|l| l.name()).collect();
            self.record(&names.join(","), action, attempt);
        }
    }
}

impl fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("policy", &self.policy)
            .field("audited", &self.audit.is_some())
            .finish()
    }
}

/// Locks held together after a successful [`LockCoordinator::acquire_all`].
///
/// Released in reverse acquisition order on drop. Not `Send`: locks must be
/// released by the thread that took them.
#[must_use = "dropping a LockSet releases its locks immediately"]
pub struct LockSet<'a, L: Lockable + ?Sized> {
    locks: Vec<&'a L>,
    audit: Option<Arc<dyn AuditSink>>,
    _not_send: PhantomData<*const ()>,
}

impl<'a, L: Lockable + ?Sized> LockSet<'a, L> {
    fn new(locks: Vec<&'a L>, audit: Option<Arc<dyn AuditSink>>) -> Self {
        Self {
            locks,
            audit,
            _not_send: PhantomData,
        }
    }

    /// Held locks in acquisition order.
    pub fn locks(&self) -> &[&'a L] {
        &self.locks
    }

    /// Names of the held locks in acquisition order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.locks.iter().map(|l| l.name())
    }

    /// Number of held locks.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Release every lock, last acquired first.
    pub fn release(self) {
        drop(self);
    }
}

impl<L: Lockable + ?Sized> Drop for LockSet<'_, L> {
    fn drop(&mut self) {
        while let Some(lock) = self.locks.pop() {
            lock.release();
            if let Some(sink) = &self.audit {
                sink.record(build_audit_event(lock.name(), LockAction::Released, 0));
            }
        }
    }
}

impl<L: Lockable + ?Sized> fmt::Debug for LockSet<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
