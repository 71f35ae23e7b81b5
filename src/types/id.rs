//! Identifier types for promise cells.
//!
//! Every promise cell carries a [`PromiseId`] so that log events and `Debug`
//! output can be correlated across a chain without requiring `T: Debug`.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PROMISE_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique identifier for a promise cell.
///
/// Identifiers are allocated in creation order, so a promise derived from
/// another always has a larger id than its parent.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromiseId(u64);

impl PromiseId {
    /// Allocates the next identifier.
    pub(crate) fn next() -> Self {
        Self(NEXT_PROMISE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Creates an identifier with a fixed value for tests.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PromiseId({})", self.0)
    }
}

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}
