//! Global resource ordering.
//!
//! Every resource class that can appear in a multi-lock request is assigned a
//! unique integer rank. Locks are always taken in ascending rank, which breaks
//! the circular-wait condition required for a deadlock.
//!
//! Resource classes are a closed set: callers describe them as an enum that
//! implements [`ResourceOrder`], listing every variant in [`ResourceOrder::ALL`].
//!
//! ```
//! use prometheus_lock_order::core::{validate_order, ResourceOrder};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Store {
//!     Catalog,
//!     Segment,
//! }
//!
//! impl ResourceOrder for Store {
//!     const ALL: &'static [Self] = &[Self::Catalog, Self::Segment];
//!
//!     fn rank(self) -> u32 {
//!         match self {
//!             Self::Catalog => 1,
//!             Self::Segment => 2,
//!         }
//!     }
//!
//!     fn label(self) -> &'static str {
//!         match self {
//!             Self::Catalog => "catalog",
//!             Self::Segment => "segment",
//!         }
//!     }
//! }
//!
//! assert!(validate_order::<Store>().is_ok());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

use crate::core::error::OrderError;

/// A closed set of resource classes with a total order over them.
pub trait ResourceOrder: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Every class of this set. Must be exhaustive.
    const ALL: &'static [Self];

    /// Rank of this class. Lower ranks are locked first.
    fn rank(self) -> u32;

    /// Stable, human-readable name for diagnostics.
    fn label(self) -> &'static str;
}

/// Default two-class order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// First resource, rank 1.
    ResourceA,
    /// Second resource, rank 2.
    ResourceB,
}

impl ResourceOrder for ResourceClass {
    const ALL: &'static [Self] = &[Self::ResourceA, Self::ResourceB];

    fn rank(self) -> u32 {
        match self {
            Self::ResourceA => 1,
            Self::ResourceB => 2,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::ResourceA => "resource_a",
            Self::ResourceB => "resource_b",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label(), self.rank())
    }
}

/// Canonical sort key of a lock: rank first, then creation sequence.
///
/// The sequence is the tie-break for two handles of the same class, so the
/// order stays total and identical for every thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LockKey {
    /// Rank of the resource class.
    pub rank: u32,
    /// Process-unique creation sequence.
    pub seq: u64,
}

impl LockKey {
    /// Build a key from its parts.
    #[must_use]
    pub const fn new(rank: u32, seq: u64) -> Self {
        Self { rank, seq }
    }
}

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Hand out the next lock creation sequence number.
pub(crate) fn next_sequence() -> u64 {
    NEXT_SEQ.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Compare two classes by rank.
#[must_use]
pub fn compare<R: ResourceOrder>(a: R, b: R) -> Ordering {
    a.rank().cmp(&b.rank())
}

/// Whether `first` must be locked before `second`.
#[must_use]
pub fn is_valid_order<R: ResourceOrder>(first: R, second: R) -> bool {
    first.rank() < second.rank()
}

/// Check that `R` describes a usable total order: non-empty, unique ranks.
pub fn validate_order<R: ResourceOrder>() -> Result<(), OrderError> {
    if R::ALL.is_empty() {
        return Err(OrderError::Empty);
    }
    let mut classes: Vec<R> = R::ALL.to_vec();
    classes.sort_by_key(|c| c.rank());
    for pair in classes.windows(2) {
        if pair[0].rank() == pair[1].rank() {
            return Err(OrderError::DuplicateRank {
                rank: pair[0].rank(),
                first: pair[0].label(),
                second: pair[1].label(),
            });
        }
    }
    Ok(())
}
