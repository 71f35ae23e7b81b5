//! Quorum combinator: `count`-of-N fulfillment.
//!
//! `some(items, count)` fulfills as soon as `count` inputs have fulfilled and
//! rejects as soon as so many have rejected that `count` fulfillments can no
//! longer be reached:
//!
//! ```text
//! some([a1..an], m):
//!   values  ← []              // fulfillment order
//!   reasons ← []              // rejection order
//!   on fulfill(v): values.push(v);  if |values| = m         → fulfill(values)
//!   on reject(e):  reasons.push(e); if |reasons| = n - m + 1 → reject(reasons)
//! ```
//!
//! Losing inputs are not canceled; their eventual outcomes are ignored.
//!
//! # Edge Cases
//!
//! - `count` larger than the number of inputs is clamped to it
//! - `count == 0` or no inputs: fulfills with `[]`

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use crate::promise::{resolve, Deferred, Promise, Reaction, Resolvable};

struct Tally<T, E> {
    values: Vec<T>,
    reasons: Vec<E>,
}

/// Fulfills with the first `count` values to arrive, in arrival order.
///
/// Rejects with every rejection reason collected so far, in rejection order,
/// once `count` fulfillments have become impossible.
pub fn some<T, E, I>(items: I, count: usize) -> Promise<Vec<T>, Vec<E>>
where
    T: Clone + 'static,
    E: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Resolvable<T, E>>,
{
    let items: Vec<Promise<T, E>> = items.into_iter().map(resolve).collect();
    let deferred = Deferred::new();
    let needed = count.min(items.len());
    if needed == 0 {
        return deferred.resolve(Resolvable::Value(Vec::new()));
    }
    let fatal = items.len() - needed + 1;

    let tally = Rc::new(RefCell::new(Tally {
        values: Vec::with_capacity(needed),
        reasons: Vec::new(),
    }));
    for item in items {
        let tally = Rc::clone(&tally);
        let resolver = deferred.resolver();
        let relay = deferred.resolver();
        item.subscribe(Reaction::new(
            move |outcome| {
                if resolver.is_resolved() {
                    return;
                }
                let mut state = tally.borrow_mut();
                match outcome {
                    Ok(value) => {
                        state.values.push(value);
                        if state.values.len() == needed {
                            let values = mem::take(&mut state.values);
                            drop(state);
                            resolver.resolve(Resolvable::Value(values));
                        }
                    }
                    Err(reason) => {
                        state.reasons.push(reason);
                        if state.reasons.len() == fatal {
                            let reasons = mem::take(&mut state.reasons);
                            drop(state);
                            resolver.reject(reasons);
                        }
                    }
                }
            },
            move |update| {
                relay.notify(update.clone());
            },
        ));
    }
    deferred.into_promise()
}
