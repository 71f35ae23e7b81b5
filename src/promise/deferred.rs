//! Deferreds: a promise paired with the capability to settle it.
//!
//! A [`Deferred`] owns exactly one promise. Its [`Resolver`] may be cloned and
//! handed out (to an executor, a thenable, another subsystem); whichever
//! clone resolves or rejects first wins, and every later call is a no-op that
//! returns the same, already-fixed promise.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::promise::resolution::{Resolution, Resolvable};
use crate::promise::{CancelHook, Origin, Promise};
use crate::types::Progress;

type Canceler<E> = Box<dyn FnOnce(E) -> E>;

/// The settlement capabilities of one promise.
pub struct Resolver<T, E> {
    promise: Promise<T, E>,
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T, E> Resolver<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Resolves the promise with a value, promise or thenable.
    ///
    /// Only the first call to `resolve` or [`reject`](Self::reject) has an
    /// effect. Every call returns the resolver's promise.
    pub fn resolve(&self, x: impl Into<Resolvable<T, E>>) -> Promise<T, E> {
        if self.promise.begin_resolution() {
            self.promise.resolve_with(Resolution::from(x.into()));
        } else {
            debug!(promise_id = %self.promise.id(), "resolve ignored, promise already resolved");
        }
        self.promise.clone()
    }

    /// Rejects the promise.
    pub fn reject(&self, reason: E) -> Promise<T, E> {
        if self.promise.begin_resolution() {
            self.promise.settle(Err(reason));
        } else {
            debug!(promise_id = %self.promise.id(), "reject ignored, promise already resolved");
        }
        self.promise.clone()
    }

    /// Sends a progress update to the promise's progress handlers.
    ///
    /// Ignored once the promise has been resolved. Returns `update`.
    pub fn notify(&self, update: Progress) -> Progress {
        if !self.promise.is_resolved() {
            self.promise.notify(&update);
        }
        update
    }

    /// True once `resolve` or `reject` has been called.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.promise.is_resolved()
    }

    /// The promise this resolver settles.
    #[must_use]
    pub fn promise(&self) -> &Promise<T, E> {
        &self.promise
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("promise", &self.promise.id())
            .finish()
    }
}

/// A pending promise and the means to settle it.
pub struct Deferred<T, E> {
    resolver: Resolver<T, E>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
        }
    }
}

impl<T, E> Default for Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Creates a deferred without cancellation support.
    #[must_use]
    pub fn new() -> Self {
        Self::from_promise(Promise::pending(Origin::Deferred, None))
    }

    /// Creates a cancelable deferred.
    ///
    /// [`cancel`](Self::cancel) passes its reason through `canceler` and
    /// rejects with the result, unless the deferred was already resolved, in
    /// which case `canceler` is never called.
    #[must_use]
    pub fn with_canceler<C>(canceler: C) -> Self
    where
        C: FnOnce(E) -> E + 'static,
    {
        let promise = Promise::pending(Origin::Deferred, None);
        let weak = promise.downgrade();
        let canceler: RefCell<Option<Canceler<E>>> = RefCell::new(Some(Box::new(canceler)));
        let hook: CancelHook<E> = Rc::new(move |reason| {
            let Some(promise) = weak.upgrade() else {
                return false;
            };
            if !promise.begin_resolution() {
                debug!(promise_id = %promise.id(), "cancel ignored, promise already resolved");
                return false;
            }
            let Some(canceler) = canceler.borrow_mut().take() else {
                return false;
            };
            debug!(promise_id = %promise.id(), "promise canceled");
            promise.settle(Err(canceler(reason)));
            true
        });
        promise.set_cancel_hook(hook);
        Self::from_promise(promise)
    }

    fn from_promise(promise: Promise<T, E>) -> Self {
        Self {
            resolver: Resolver { promise },
        }
    }

    /// The deferred's promise.
    #[must_use]
    pub fn promise(&self) -> &Promise<T, E> {
        &self.resolver.promise
    }

    /// Consumes the deferred, keeping only its promise.
    #[must_use]
    pub fn into_promise(self) -> Promise<T, E> {
        self.resolver.promise
    }

    /// A clonable handle to the settlement capabilities.
    #[must_use]
    pub fn resolver(&self) -> Resolver<T, E> {
        self.resolver.clone()
    }

    /// See [`Resolver::resolve`].
    pub fn resolve(&self, x: impl Into<Resolvable<T, E>>) -> Promise<T, E> {
        self.resolver.resolve(x)
    }

    /// See [`Resolver::reject`].
    pub fn reject(&self, reason: E) -> Promise<T, E> {
        self.resolver.reject(reason)
    }

    /// See [`Resolver::notify`].
    pub fn notify(&self, update: Progress) -> Progress {
        self.resolver.notify(update)
    }

    /// True once `resolve`, `reject` or a successful `cancel` happened.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolver.is_resolved()
    }

    /// True if the deferred was created with a canceler.
    #[must_use]
    pub fn is_cancelable(&self) -> bool {
        self.resolver.promise.has_cancel_hook()
    }

    /// Cancels the deferred.
    ///
    /// Returns `None` if the deferred has no canceler. Otherwise returns the
    /// promise, which is rejected with the canceler's result if it was still
    /// unresolved and left untouched if not.
    pub fn cancel(&self, reason: E) -> Option<Promise<T, E>> {
        if !self.is_cancelable() {
            return None;
        }
        self.resolver.promise.cancel(reason);
        Some(self.resolver.promise.clone())
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("promise", &self.resolver.promise.id())
            .finish()
    }
}

/// Creates a new [`Deferred`].
#[must_use]
pub fn defer<T, E>() -> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    Deferred::new()
}
