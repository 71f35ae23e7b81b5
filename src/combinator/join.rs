//! Join combinators: wait for every input.
//!
//! # Semantics
//!
//! `all(items)`:
//! 1. Resolve every item (values, promises and thenables alike)
//! 2. Collect each fulfillment into the slot of its input index
//! 3. Fulfill with the slots once the last one fills, or reject with the
//!    first rejection
//!
//! Inputs still in flight after a rejection keep running; their results are
//! discarded.
//!
//! # Laws
//!
//! - Order: `all(items)` lists values in input order, not completion order
//! - Identity: `all([])` fulfills with `[]`
//! - Flattening: `all([resolve(p)])` ≃ `all([p])`

use crate::combinator::map_reduce::{map, map_of};
use crate::promise::{resolve, Deferred, Promise, Resolvable};
use crate::types::Snapshot;

/// Fulfills with every input's value, in input order.
///
/// Rejects with the first rejection reason.
pub fn all<T, E, I>(items: I) -> Promise<Vec<T>, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Resolvable<T, E>>,
{
    map(items, Ok)
}

/// [`all`] over a promised list.
///
/// Handlers for the joined result attach as usual, e.g.
/// `all_of(list).then_with(on_fulfilled, on_rejected, on_progress)`.
pub fn all_of<T, E, L>(list: L) -> Promise<Vec<T>, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    L: Into<Resolvable<Vec<Resolvable<T, E>>, E>>,
{
    map_of(list, Ok)
}

/// Same as [`all`]; see also the [`join!`](crate::join!) macro.
pub fn join<T, E, I>(items: I) -> Promise<Vec<T>, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Resolvable<T, E>>,
{
    all(items)
}

/// Joins a comma-separated list of values, promises or thenables.
///
/// Each argument must convert into a [`Resolvable`](crate::Resolvable); the
/// result is the same as [`all`](crate::combinator::all) over the list.
///
/// ```
/// use vow::{block_on, join, Promise, Resolvable};
///
/// let a: Promise<i32, ()> = Promise::fulfilled(1);
/// let joined = join!(a, Resolvable::Value(2));
/// assert_eq!(block_on(&joined).unwrap(), Ok(vec![1, 2]));
/// ```
#[macro_export]
macro_rules! join {
    ($($item:expr),* $(,)?) => {
        $crate::combinator::all(::std::vec![$($crate::Resolvable::from($item)),*])
    };
}

/// Settles `deferred` with the eventual outcome of `source`.
///
/// Progress from `source` is forwarded. Returns the deferred's promise.
pub fn chain<T, E>(source: impl Into<Resolvable<T, E>>, deferred: &Deferred<T, E>) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    deferred.resolve(source)
}

/// Like [`chain`], but resolves with `value` once `source` fulfills.
///
/// A rejection of `source` is still forwarded.
pub fn chain_with<T, U, E>(
    source: impl Into<Resolvable<T, E>>,
    deferred: &Deferred<U, E>,
    value: impl Into<Resolvable<U, E>>,
) -> Promise<U, E>
where
    T: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
{
    deferred.resolve(resolve(source).yield_value(value))
}

/// Fulfills with a snapshot of every input once all have settled.
///
/// Never rejects.
pub fn settle<T, E, I>(items: I) -> Promise<Vec<Snapshot<T, E>>, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Resolvable<T, E>>,
{
    map(
        items.into_iter().map(|item| {
            resolve(item).then_or(
                |value| Ok(Snapshot::Fulfilled(value)),
                |reason| Ok(Snapshot::Rejected(reason)),
            )
        }),
        Ok,
    )
}

/// Moves `source`'s outcome onto a fresh deferred.
pub(crate) fn forward<T, E>(source: Promise<T, E>) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    chain(source, &Deferred::new())
}
