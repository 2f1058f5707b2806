//! Audit trail of lock lifecycle events.
//!
//! The coordinator records every acquisition, timeout, rollback, backoff and
//! release to an optional [`AuditSink`]. The in-memory sink keeps a bounded
//! buffer, which is enough to reconstruct the order in which a thread actually
//! took its locks.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::clock::now_ms;
use crate::util::thread::thread_label;

/// What happened to a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockAction {
    /// Lock acquired during an attempt.
    Acquired,
    /// Bounded wait for the lock ran out.
    TimedOut,
    /// Lock released while rolling back a failed attempt.
    RolledBack,
    /// Thread sleeping before the next attempt.
    BackedOff,
    /// Wait or backoff cancelled.
    Cancelled,
    /// All attempts failed.
    Exhausted,
    /// Lock released by its holder.
    Released,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Lock name, or the whole request for request-level events.
    pub lock: String,
    /// Action taken.
    pub action: LockAction,
    /// Attempt number (1-based), zero outside an attempt.
    pub attempt: u32,
    /// Thread the event happened on.
    pub thread: String,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

/// Audit sink abstraction.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: Mutex<VecDeque<AuditEvent>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Events recorded on one thread, oldest first.
    pub fn events_for_thread(&self, thread: &str) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.thread == thread)
            .cloned()
            .collect()
    }

    /// Drop all stored events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Build an event stamped with the calling thread and the current time.
pub fn build_audit_event(lock: impl Into<String>, action: LockAction, attempt: u32) -> AuditEvent {
    AuditEvent {
        event_id: Uuid::new_v4().to_string(),
        lock: lock.into(),
        action,
        attempt,
        thread: thread_label(),
        created_at_ms: now_ms(),
    }
}
