//! Adapters that let plain functions consume promised arguments.
//!
//! Each adapter waits for its arguments, calls the function once they are
//! all fulfilled, and returns a promise for the result. A rejected argument
//! skips the call and rejects the result.

use std::rc::Rc;

use crate::combinator::all;
use crate::combinator::join::forward;
use crate::promise::{resolve, IntoResolution, Promise, Resolution, Resolvable};

/// One stage of a [`compose`]d pipeline.
pub type Step<T, E> = Rc<dyn Fn(T) -> Resolution<T, E>>;

/// Calls `f` with every argument's value once all have fulfilled.
pub fn apply<A, U, E, I, F, R>(f: F, args: I) -> Promise<U, E>
where
    A: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Resolvable<A, E>>,
    F: FnOnce(Vec<A>) -> R + 'static,
    R: IntoResolution<U, E>,
{
    forward(all(args).then(f))
}

/// Calls `f` with `arg`'s value once it has fulfilled.
pub fn call<A, U, E, F, R>(f: F, arg: impl Into<Resolvable<A, E>>) -> Promise<U, E>
where
    A: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
    F: FnOnce(A) -> R + 'static,
    R: IntoResolution<U, E>,
{
    forward(resolve(arg).then(f))
}

/// Turns `f` into a function over promised arguments.
pub fn lift<A, U, E, F, R>(f: F) -> impl Fn(Vec<Resolvable<A, E>>) -> Promise<U, E>
where
    A: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
    F: Fn(Vec<A>) -> R + 'static,
    R: IntoResolution<U, E>,
{
    let f = Rc::new(f);
    move |args| {
        let f = Rc::clone(&f);
        apply(move |values| f(values), args)
    }
}

/// Like [`lift`], with `leading` bound as the first arguments.
///
/// The leading arguments are resolved once, when the function is lifted.
pub fn lift_with<A, U, E, F, R>(
    f: F,
    leading: Vec<Resolvable<A, E>>,
) -> impl Fn(Vec<Resolvable<A, E>>) -> Promise<U, E>
where
    A: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
    F: Fn(Vec<A>) -> R + 'static,
    R: IntoResolution<U, E>,
{
    let leading: Vec<Promise<A, E>> = leading.into_iter().map(resolve).collect();
    for arg in &leading {
        arg.mark_handled();
    }
    let lifted = lift(f);
    move |rest| {
        let args: Vec<Resolvable<A, E>> = leading.iter().map(Resolvable::from).chain(rest).collect();
        lifted(args)
    }
}

/// Wraps a closure as a [`Step`].
pub fn step<T, E, F, R>(f: F) -> Step<T, E>
where
    F: Fn(T) -> R + 'static,
    R: IntoResolution<T, E>,
{
    Rc::new(move |value| f(value).into_resolution())
}

/// Chains `steps` left to right; each receives the previous step's value.
pub fn compose<T, E>(steps: Vec<Step<T, E>>) -> impl Fn(Resolvable<T, E>) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    move |input| {
        let out = steps.iter().fold(resolve(input), |acc, step| {
            let step = Rc::clone(step);
            acc.then(move |value| step(value))
        });
        forward(out)
    }
}
