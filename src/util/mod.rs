//! Shared utilities.

pub mod clock;
pub mod telemetry;
pub mod thread;

pub use clock::*;
pub use telemetry::*;
pub use thread::*;
