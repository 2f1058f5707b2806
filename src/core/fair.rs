//! Fair, reentrant exclusive lock with a bounded wait.
//!
//! Built from a `parking_lot` mutex and condition variable. Waiters queue in
//! arrival order and only the head of the queue may take a free lock, so a
//! newly arriving thread never overtakes a thread that is already waiting.
//! The owning thread may lock again without blocking; it must unlock as many
//! times as it locked.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::time::Instant;

use lock_api::GetThreadId;
use parking_lot::{Condvar, Mutex, RawThreadId};

use crate::core::cancel::{CancellationToken, Interrupt};

/// Result of a bounded wait for a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The calling thread now owns the lock.
    Acquired,
    /// The deadline passed first. Nothing is held.
    TimedOut,
    /// The wait was cancelled. Nothing is held.
    Cancelled,
}

#[derive(Debug, Default)]
struct FairState {
    owner: Option<NonZeroUsize>,
    holds: u64,
    queue: VecDeque<u64>,
    next_ticket: u64,
}

impl FairState {
    fn grant(&mut self, me: NonZeroUsize) {
        self.owner = Some(me);
        self.holds = 1;
    }

    fn leave_queue(&mut self, ticket: u64) {
        self.queue.retain(|t| *t != ticket);
    }
}

/// Fair reentrant lock shared behind an `Arc` so cancellation can reach it.
#[derive(Debug, Default)]
pub(crate) struct FairLock {
    state: Mutex<FairState>,
    available: Condvar,
}

pub(crate) fn current_thread() -> NonZeroUsize {
    RawThreadId::INIT.nonzero_thread_id()
}

impl FairLock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Lock, waiting in FIFO order until `deadline` (forever if `None`).
    pub(crate) fn lock_until(
        self: &std::sync::Arc<Self>,
        deadline: Option<Instant>,
        cancel: Option<&CancellationToken>,
    ) -> AcquireOutcome {
        let me = current_thread();

        // Registration must outlive the state guard below.
        let _registration = cancel.map(|token| token.register(self.clone()));
        let mut state = self.state.lock();

        if state.owner == Some(me) {
            state.holds += 1;
            return AcquireOutcome::Acquired;
        }
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return AcquireOutcome::Cancelled;
        }
        if state.owner.is_none() && state.queue.is_empty() {
            state.grant(me);
            return AcquireOutcome::Acquired;
        }

        let ticket = state.next_ticket;
        state.next_ticket = state.next_ticket.wrapping_add(1);
        state.queue.push_back(ticket);

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                state.leave_queue(ticket);
                self.available.notify_all();
                return AcquireOutcome::Cancelled;
            }
            if state.owner.is_none() && state.queue.front() == Some(&ticket) {
                state.queue.pop_front();
                state.grant(me);
                return AcquireOutcome::Acquired;
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        state.leave_queue(ticket);
                        self.available.notify_all();
                        return AcquireOutcome::TimedOut;
                    }
                    self.available.wait_until(&mut state, deadline);
                }
                None => self.available.wait(&mut state),
            }
        }
    }

    /// Drop one hold. Returns `false` if the caller is not the owner.
    pub(crate) fn unlock(&self) -> bool {
        let me = current_thread();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return false;
        }
        state.holds -= 1;
        if state.holds == 0 {
            state.owner = None;
            self.available.notify_all();
        }
        true
    }

    pub(crate) fn is_owned_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(current_thread())
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    pub(crate) fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }
}

impl Interrupt for FairLock {
    fn interrupt(&self) {
        let _state = self.state.lock();
        self.available.notify_all();
    }
}
