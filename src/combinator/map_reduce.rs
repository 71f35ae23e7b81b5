//! Map and reduce over collections of promises and values.
//!
//! # Semantics
//!
//! `map(items, f)`: every item is resolved up front and `f` runs on each
//! value as soon as that item fulfills, so mapping is as concurrent as the
//! inputs allow. Results land in input order.
//!
//! `map_with(items, f, fallback)` also routes each rejected input through
//! `fallback`, and `map_of(list, f)` first waits for a promised list.
//!
//! `reduce(items, f, initial)`: a left fold where step `i` waits for both the
//! accumulator and item `i` before calling `f(acc, item, i, total)`. Step
//! `i + 1` never starts before step `i` has settled.
//!
//! ```text
//! reduce([a, b, c], f, init):
//!   acc0 ← init
//!   acc1 ← f(await acc0, await a, 0, 3)
//!   acc2 ← f(await acc1, await b, 1, 3)
//!   acc3 ← f(await acc2, await c, 2, 3)
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::combinator::join::forward;
use crate::promise::{resolve, Deferred, IntoResolution, Promise, Reaction, Resolvable};

/// Applies `f` to each input's value; fulfills with the results in input
/// order.
///
/// `f` may return a value, an error or a promise. The first rejection, from
/// an input or from `f`, rejects the result.
pub fn map<T, U, E, I, F, R>(items: I, f: F) -> Promise<Vec<U>, E>
where
    T: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Resolvable<T, E>>,
    F: Fn(T) -> R + 'static,
    R: IntoResolution<U, E>,
{
    let f = Rc::new(f);
    collect(items.into_iter().map(|item| {
        let f = Rc::clone(&f);
        resolve(item).then(move |value| f(value))
    }))
}

/// Like [`map`], with `fallback` applied to each rejected input.
///
/// A fallback that returns `Ok` substitutes a value for that slot; one that
/// returns `Err` rejects the result.
pub fn map_with<T, U, E, I, F, R, G, S>(items: I, f: F, fallback: G) -> Promise<Vec<U>, E>
where
    T: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Resolvable<T, E>>,
    F: Fn(T) -> R + 'static,
    R: IntoResolution<U, E>,
    G: Fn(E) -> S + 'static,
    S: IntoResolution<U, E>,
{
    let f = Rc::new(f);
    let fallback = Rc::new(fallback);
    collect(items.into_iter().map(|item| {
        let (f, fallback) = (Rc::clone(&f), Rc::clone(&fallback));
        resolve(item).then_or(move |value| f(value), move |reason| fallback(reason))
    }))
}

/// [`map`] over a promised list.
///
/// The list itself may be pending or rejected; its items may be values,
/// promises or thenables.
pub fn map_of<T, U, E, L, F, R>(list: L, f: F) -> Promise<Vec<U>, E>
where
    T: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
    L: Into<Resolvable<Vec<Resolvable<T, E>>, E>>,
    F: Fn(T) -> R + 'static,
    R: IntoResolution<U, E>,
{
    forward(resolve(list).then(move |items| map(items, f)))
}

/// Waits for every promised slot; the first rejection wins.
fn collect<U, E>(mapped: impl Iterator<Item = Promise<U, E>>) -> Promise<Vec<U>, E>
where
    U: Clone + 'static,
    E: Clone + 'static,
{
    let mapped: Vec<Promise<U, E>> = mapped.collect();
    let deferred = Deferred::new();
    let total = mapped.len();
    if total == 0 {
        return deferred.resolve(Resolvable::Value(Vec::new()));
    }

    let slots: Rc<RefCell<Vec<Option<U>>>> = Rc::new(RefCell::new(vec![None; total]));
    let remaining = Rc::new(Cell::new(total));
    for (index, slot) in mapped.into_iter().enumerate() {
        let slots = Rc::clone(&slots);
        let remaining = Rc::clone(&remaining);
        let resolver = deferred.resolver();
        let relay = deferred.resolver();
        slot.subscribe(Reaction::new(
            move |outcome| {
                if resolver.is_resolved() {
                    return;
                }
                match outcome {
                    Ok(value) => {
                        slots.borrow_mut()[index] = Some(value);
                        remaining.set(remaining.get() - 1);
                        if remaining.get() == 0 {
                            let values: Vec<U> = slots.borrow_mut().drain(..).flatten().collect();
                            resolver.resolve(Resolvable::Value(values));
                        }
                    }
                    Err(reason) => {
                        resolver.reject(reason);
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

/// Sequential left fold over the inputs.
///
/// `initial` may be a promise. `f` receives the accumulator, the item, the
/// item's index and the number of items, and may return a promise.
pub fn reduce<T, A, E, I, F, R>(items: I, f: F, initial: impl Into<Resolvable<A, E>>) -> Promise<A, E>
where
    T: Clone + 'static,
    A: Clone + 'static,
    E: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Resolvable<T, E>>,
    F: Fn(A, T, usize, usize) -> R + 'static,
    R: IntoResolution<A, E>,
{
    let items: Vec<Promise<T, E>> = items.into_iter().map(resolve).collect();
    let total = items.len();
    let f = Rc::new(f);
    let folded = items
        .into_iter()
        .enumerate()
        .fold(resolve(initial), |acc, (index, item)| {
            // A rejected accumulator skips the remaining items.
            item.mark_handled();
            let f = Rc::clone(&f);
            acc.then(move |acc| item.then(move |value| f(acc, value, index, total)))
        });
    forward(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_on;
    use crate::promise::defer;
    use crate::runtime::run_until_idle;
    use crate::test_utils::init_test_logging;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn map_runs_eagerly_and_keeps_order() {
        init_test("map_runs_eagerly_and_keeps_order");
        let first: Deferred<i32, ()> = defer();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&calls);
        let mapped = map(
            vec![Resolvable::from(first.promise()), Resolvable::Value(2)],
            move |x| {
                log.borrow_mut().push(x);
                Ok(x * 10)
            },
        );
        run_until_idle();
        assert_eq!(*calls.borrow(), vec![2]);
        first.resolve(Resolvable::Value(1));
        assert_eq!(block_on(&mapped), Ok(Ok(vec![10, 20])));
        assert_eq!(*calls.borrow(), vec![2, 1]);
        crate::test_complete!("map_runs_eagerly_and_keeps_order");
    }

    #[test]
    fn map_function_may_return_promises() {
        init_test("map_function_may_return_promises");
        let mapped = map(vec![Resolvable::<i32, String>::Value(3)], |x| {
            Promise::fulfilled(x.to_string())
        });
        assert_eq!(block_on(&mapped), Ok(Ok(vec!["3".to_string()])));
        crate::test_complete!("map_function_may_return_promises");
    }

    #[test]
    fn map_error_rejects() {
        init_test("map_error_rejects");
        let mapped = map(
            vec![Resolvable::<i32, String>::Value(1), Resolvable::Value(2)],
            |x| if x == 2 { Err(format!("bad {x}")) } else { Ok(x) },
        );
        assert_eq!(block_on(&mapped), Ok(Err("bad 2".to_string())));
        crate::test_complete!("map_error_rejects");
    }

    #[test]
    fn map_forwards_progress() {
        init_test("map_forwards_progress");
        let input: Deferred<i32, ()> = defer();
        let seen = Rc::new(Cell::new(0u8));
        let sink = Rc::clone(&seen);
        let mapped = map(vec![Resolvable::from(input.promise())], Ok)
            .progress(move |u| sink.set(*u.downcast_ref::<u8>().unwrap_or(&0)));
        input.notify(crate::Progress::new(9u8));
        run_until_idle();
        assert_eq!(seen.get(), 9);
        input.resolve(Resolvable::Value(1));
        assert_eq!(block_on(&mapped), Ok(Ok(vec![1])));
        crate::test_complete!("map_forwards_progress");
    }

    #[test]
    fn reduce_folds_left() {
        init_test("reduce_folds_left");
        let sum = reduce(
            vec![
                Resolvable::<i32, ()>::Value(1),
                Resolvable::from(Promise::fulfilled(2)),
                Resolvable::Value(3),
            ],
            |acc, x, _, _| Ok(acc + x),
            Resolvable::Value(0),
        );
        assert_eq!(block_on(&sum), Ok(Ok(6)));
        crate::test_complete!("reduce_folds_left");
    }

    #[test]
    fn reduce_passes_index_and_total() {
        init_test("reduce_passes_index_and_total");
        let trail = reduce(
            vec![Resolvable::<char, ()>::Value('a'), Resolvable::Value('b')],
            |mut acc: String, c, index, total| {
                acc.push_str(&format!("{c}{index}/{total} "));
                Ok(acc)
            },
            Resolvable::Value(String::new()),
        );
        assert_eq!(block_on(&trail), Ok(Ok("a0/2 b1/2 ".to_string())));
        crate::test_complete!("reduce_passes_index_and_total");
    }

    #[test]
    fn reduce_of_nothing_is_initial() {
        init_test("reduce_of_nothing_is_initial");
        let initial: Deferred<i32, ()> = defer();
        let folded = reduce(
            Vec::<Resolvable<i32, ()>>::new(),
            |acc, x, _, _| Ok(acc + x),
            initial.promise(),
        );
        initial.resolve(Resolvable::Value(11));
        assert_eq!(block_on(&folded), Ok(Ok(11)));
        crate::test_complete!("reduce_of_nothing_is_initial");
    }

    #[test]
    fn reduce_stops_at_first_rejection() {
        init_test("reduce_stops_at_first_rejection");
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let folded = reduce(
            vec![
                Resolvable::<i32, &str>::Value(1),
                Resolvable::from(Promise::rejected("x")),
                Resolvable::Value(3),
            ],
            move |acc, x, _, _| {
                counter.set(counter.get() + 1);
                Ok(acc + x)
            },
            Resolvable::Value(0),
        );
        assert_eq!(block_on(&folded), Ok(Err("x")));
        assert_eq!(calls.get(), 1);
        crate::test_complete!("reduce_stops_at_first_rejection");
    }

    #[test]
    fn map_with_substitutes_rejected_items() {
        init_test("map_with_substitutes_rejected_items");
        let mapped: Promise<Vec<i32>, String> = map_with(
            vec![
                Resolvable::<i32, String>::Value(1),
                Resolvable::from(Promise::rejected("gone".to_string())),
                Resolvable::Value(3),
            ],
            |x: i32| Ok(x * 2),
            |reason: String| Ok(if reason == "gone" { -1 } else { 0 }),
        );
        assert_eq!(block_on(&mapped), Ok(Ok(vec![2, -1, 6])));

        let failed: Promise<Vec<i32>, String> = map_with(
            vec![Resolvable::<i32, String>::from(Promise::rejected("a".to_string()))],
            |x: i32| Ok(x),
            |reason: String| Err::<i32, _>(format!("still {reason}")),
        );
        assert_eq!(block_on(&failed), Ok(Err("still a".to_string())));
        crate::test_complete!("map_with_substitutes_rejected_items");
    }

    #[test]
    fn map_of_waits_for_the_list() {
        init_test("map_of_waits_for_the_list");
        let list: Deferred<Vec<Resolvable<i32, ()>>, ()> = defer();
        let late: Deferred<i32, ()> = defer();
        let mapped: Promise<Vec<i32>, ()> = map_of(list.promise(), |x: i32| Ok(x + 1));
        run_until_idle();
        crate::assert_pending!(mapped);
        list.resolve(Resolvable::Value(vec![
            Resolvable::Value(1),
            Resolvable::from(late.promise()),
        ]));
        run_until_idle();
        crate::assert_pending!(mapped);
        late.resolve(Resolvable::Value(10));
        assert_eq!(block_on(&mapped), Ok(Ok(vec![2, 11])));

        let rejected: Promise<Vec<i32>, &str> = map_of(
            Promise::<Vec<Resolvable<i32, &str>>, &str>::rejected("no list"),
            |x: i32| Ok(x),
        );
        assert_eq!(block_on(&rejected), Ok(Err("no list")));
        crate::test_complete!("map_of_waits_for_the_list");
    }

    #[test]
    fn abandoned_reduce_drops_cleanly() {
        init_test("abandoned_reduce_drops_cleanly");
        let initial: Deferred<u64, ()> = defer();
        let sum: Promise<u64, ()> = reduce(
            (0..20_000u64).map(Resolvable::<u64, ()>::Value),
            |acc: u64, x: u64, _, _| Ok(acc + x),
            initial.promise(),
        );
        run_until_idle();
        crate::assert_pending!(sum);
        let weak = sum.downgrade();
        drop(sum);
        drop(initial);
        run_until_idle();
        assert!(weak.upgrade().is_none());
        crate::test_complete!("abandoned_reduce_drops_cleanly");
    }
}
