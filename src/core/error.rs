//! Error types for lock ordering and acquisition.

use thiserror::Error;

/// Errors surfaced by the acquisition coordinator.
///
/// A single lock timing out is not an error on its own; it is retried
/// internally and only shows up here once every attempt has failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireError {
    /// Every attempt failed. Nothing is held.
    #[error("failed to acquire {locks} locks after {attempts} attempts")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Locks in the request.
        locks: usize,
    },
    /// The wait or the backoff sleep was cancelled. Nothing is held.
    #[error("lock acquisition cancelled")]
    Cancelled,
    /// The same lock appeared twice in one request.
    #[error("duplicate lock `{0}` in acquisition request")]
    DuplicateLock(String),
}

/// Errors in a resource order definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// No resource classes were declared.
    #[error("resource order declares no classes")]
    Empty,
    /// Two classes share a rank.
    #[error("rank {rank} shared by `{first}` and `{second}`")]
    DuplicateRank {
        /// The shared rank.
        rank: u32,
        /// First class with the rank.
        first: &'static str,
        /// Second class with the rank.
        second: &'static str,
    },
}

/// Errors from releasing a lock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReleaseError {
    /// The calling thread does not own the lock.
    #[error("lock `{0}` released by a thread that does not own it")]
    NotOwner(String),
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Values failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// An environment variable could not be parsed.
    #[error("environment variable `{name}`: {reason}")]
    Env {
        /// Variable name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
