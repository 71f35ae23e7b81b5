//! Point-in-time views of a promise and type-erased progress updates.

use core::fmt;
use std::any::Any;
use std::rc::Rc;

/// The settlement state of a promise, without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Not yet settled.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a reason.
    Rejected,
}

impl State {
    /// Returns true once the promise can no longer change.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Fulfilled => f.write_str("fulfilled"),
            Self::Rejected => f.write_str("rejected"),
        }
    }
}

/// A synchronous snapshot of a promise, as returned by
/// [`Promise::inspect`](crate::Promise::inspect).
///
/// The snapshot owns clones of the value or reason; it never blocks and
/// never observes a later transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot<T, E> {
    /// The promise has not settled yet.
    Pending,
    /// The promise fulfilled with this value.
    Fulfilled(T),
    /// The promise rejected with this reason.
    Rejected(E),
}

impl<T, E> Snapshot<T, E> {
    /// Returns the state tag of this snapshot.
    #[must_use]
    pub const fn state(&self) -> State {
        match self {
            Self::Pending => State::Pending,
            Self::Fulfilled(_) => State::Fulfilled,
            Self::Rejected(_) => State::Rejected,
        }
    }

    /// Returns true if the promise was pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if the promise was fulfilled.
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    /// Returns true if the promise was rejected.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns the fulfillment value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Fulfilled(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the rejection reason, if any.
    #[must_use]
    pub const fn reason(&self) -> Option<&E> {
        match self {
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }

    /// Converts a settled snapshot into a `Result`; `None` while pending.
    pub fn into_result(self) -> Option<Result<T, E>> {
        match self {
            Self::Pending => None,
            Self::Fulfilled(v) => Some(Ok(v)),
            Self::Rejected(e) => Some(Err(e)),
        }
    }
}

impl<T, E> From<Result<T, E>> for Snapshot<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Self::Fulfilled(v),
            Err(e) => Self::Rejected(e),
        }
    }
}

/// A progress update delivered through `notify`.
///
/// Updates are type-erased so that one chain can carry arbitrary progress
/// payloads independently of its value and reason types. Cloning is cheap.
#[derive(Clone)]
pub struct Progress(Rc<dyn Any>);

impl Progress {
    /// Wraps an arbitrary payload.
    #[must_use]
    pub fn new<V: Any>(payload: V) -> Self {
        Self(Rc::new(payload))
    }

    /// Returns the payload if it has type `V`.
    #[must_use]
    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.0.downcast_ref::<V>()
    }

    /// Returns true if the payload has type `V`.
    #[must_use]
    pub fn is<V: Any>(&self) -> bool {
        self.0.is::<V>()
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Progress(..)")
    }
}
