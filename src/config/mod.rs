//! Configuration models for the acquisition coordinator.

pub mod coordinator;

pub use coordinator::{CoordinatorConfig, ENV_PREFIX};
