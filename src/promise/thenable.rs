//! Assimilation of foreign thenables.
//!
//! This is the only place the crate calls into an object it does not own.
//! A thenable gets exactly one `then` call, with a fresh [`Resolver`]; it may
//! resolve, reject or notify through it any number of times, but only the
//! first resolution counts.

use std::rc::Rc;

use tracing::trace;

use crate::promise::deferred::{Deferred, Resolver};
use crate::promise::resolution::{IntoResolution, Resolvable};
use crate::promise::Promise;

/// Anything that can report an eventual outcome to a [`Resolver`].
///
/// Returning `Err` is a synchronous failure; it rejects the assimilating
/// promise unless the thenable already resolved it.
pub trait Thenable<T, E> {
    /// Hands the resolver to the thenable.
    fn then(&self, resolver: Resolver<T, E>) -> Result<(), E>;
}

impl<T, E, F> Thenable<T, E> for F
where
    F: Fn(Resolver<T, E>) -> Result<(), E>,
{
    fn then(&self, resolver: Resolver<T, E>) -> Result<(), E> {
        self(resolver)
    }
}

/// Wraps a foreign thenable in a trusted promise.
pub(crate) fn assimilate<T, E>(thenable: Rc<dyn Thenable<T, E>>) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let deferred = Deferred::new();
    trace!(promise_id = %deferred.promise().id(), "assimilating thenable");
    if let Err(reason) = thenable.then(deferred.resolver()) {
        deferred.reject(reason);
    }
    deferred.into_promise()
}

/// Returns a trusted promise for `x`.
///
/// A promise is returned unchanged, a plain value becomes an
/// already-fulfilled promise, and a thenable is assimilated.
pub fn resolve<T, E>(x: impl Into<Resolvable<T, E>>) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    match x.into() {
        Resolvable::Value(value) => Promise::fulfilled(value),
        Resolvable::Promise(promise) => promise,
        Resolvable::Thenable(thenable) => assimilate(thenable),
    }
}

/// Returns an already-rejected promise.
pub fn reject<T, E>(reason: E) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    Promise::rejected(reason)
}

/// Resolves `x` and applies `on_fulfilled` to its value.
pub fn when<T, E, U, F, R>(x: impl Into<Resolvable<T, E>>, on_fulfilled: F) -> Promise<U, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    U: Clone + 'static,
    F: FnOnce(T) -> R + 'static,
    R: IntoResolution<U, E>,
{
    resolve(x).then(on_fulfilled)
}
