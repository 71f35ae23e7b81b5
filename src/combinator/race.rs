//! Race combinator: first fulfillment wins.
//!
//! `any(items)` is `some(items, 1)` unwrapped to a single value. It rejects
//! only when every input has rejected, with all their reasons in rejection
//! order. Losers keep running; their outcomes are ignored.
//!
//! # Laws
//!
//! - Identity: `any([a, never])` ≃ `any([a])` once `a` fulfills
//! - Absorption: `any([])` rejects with `[]`

use crate::combinator::join::forward;
use crate::combinator::quorum::some;
use crate::promise::{Promise, Resolvable};

/// Fulfills with the first input to fulfill.
pub fn any<T, E, I>(items: I) -> Promise<T, Vec<E>>
where
    T: Clone + 'static,
    E: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Resolvable<T, E>>,
{
    let items: Vec<Resolvable<T, E>> = items.into_iter().map(Into::into).collect();
    if items.is_empty() {
        return forward(Promise::rejected(Vec::new()));
    }
    forward(some(items, 1).then(|values| values.into_iter().next().ok_or_else(Vec::new)))
}
