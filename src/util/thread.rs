//! Thread identification for log and audit records.

use std::thread;

/// Name of the calling thread, or its id when unnamed.
pub fn thread_label() -> String {
    let current = thread::current();
    current
        .name()
        .map_or_else(|| format!("{:?}", current.id()), ToOwned::to_owned)
}
