//! Lock ordering, ordered lock handles, and the acquisition coordinator.

pub mod audit;
pub mod cancel;
pub mod coordinator;
pub mod error;
pub mod fair;
pub mod lock;
pub mod order;
pub mod registry;
pub mod simulator;

pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink, LockAction};
pub use cancel::CancellationToken;
pub use coordinator::{canonical_order, AcquirePolicy, LockCoordinator, LockSet, BACKOFF_CEILING};
pub use error::{AcquireError, AppResult, ConfigError, OrderError, ReleaseError};
pub use fair::AcquireOutcome;
pub use lock::{LockStats, Lockable, OrderedLock, MAX_LOCK_TIMEOUT};
pub use order::{compare, is_valid_order, validate_order, LockKey, ResourceClass, ResourceOrder};
pub use registry::LockRegistry;
pub use simulator::DeadlockSimulator;
