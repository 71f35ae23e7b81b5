//! The promise state machine.
//!
//! A [`Promise`] is a shared handle to one cell that moves exactly once from
//! pending to fulfilled or rejected. While pending it holds an ordered list
//! of reactions; settling moves that list out and enqueues one task per
//! reaction on the current [`TaskQueue`](crate::runtime::TaskQueue), in
//! registration order. A reaction attached to an already-settled promise is
//! enqueued as well, so a handler never runs on the stack of the call that
//! registered it.
//!
//! # Handler results
//!
//! Handlers return anything implementing [`IntoResolution`]:
//!
//! - `Ok(value)` fulfills the derived promise
//! - `Err(reason)` rejects it (the handler "threw")
//! - a [`Promise`] or [`Resolvable`] is followed until it settles
//!
//! A promise never ends up holding another promise as its value.
//!
//! # Example
//!
//! ```
//! use vow::{block_on, defer, Deferred, Resolvable};
//!
//! let d: Deferred<i32, String> = defer();
//! let doubled = d.promise().then(|x| Ok(x * 2));
//! d.resolve(Resolvable::Value(21));
//! assert_eq!(block_on(&doubled).unwrap(), Ok(42));
//! ```

pub mod deferred;
pub mod future;
pub mod resolution;
pub mod thenable;

pub use deferred::{defer, Deferred, Resolver};
pub use future::Settled;
pub use resolution::{is_promise, IntoResolution, Resolution, Resolvable};
pub use thenable::{reject, resolve, when, Thenable};

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::{error, trace, warn};

use crate::runtime;
use crate::types::{Progress, PromiseId, Snapshot, State};

/// Rejects the root deferred of a chain; returns true if it took effect.
pub(crate) type CancelHook<E> = Rc<dyn Fn(E) -> bool>;

type ProgressFn = Rc<dyn Fn(&Progress)>;

/// How a promise came to exist. Only derived promises report unhandled
/// rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Deferred,
    Derived,
    Settled,
}

/// A continuation waiting on a pending promise.
pub(crate) struct Reaction<T, E> {
    settle: Box<dyn FnOnce(Result<T, E>)>,
    progress: Option<ProgressFn>,
}

impl<T, E> Reaction<T, E> {
    pub(crate) fn settled(settle: impl FnOnce(Result<T, E>) + 'static) -> Self {
        Self {
            settle: Box::new(settle),
            progress: None,
        }
    }

    pub(crate) fn new(
        settle: impl FnOnce(Result<T, E>) + 'static,
        progress: impl Fn(&Progress) + 'static,
    ) -> Self {
        Self {
            settle: Box::new(settle),
            progress: Some(Rc::new(progress)),
        }
    }
}

type Reactions<T, E> = SmallVec<[Reaction<T, E>; 1]>;

enum Settlement<T, E> {
    Pending(Reactions<T, E>),
    Fulfilled(T),
    Rejected(E),
}

struct Shared<T, E> {
    id: PromiseId,
    settlement: Settlement<T, E>,
    /// Set once a resolution has begun; a promise adopting another one is
    /// resolved but still pending.
    resolved: bool,
    origin: Origin,
    cancel: Option<CancelHook<E>>,
    /// The promise this one adopted, while both are pending.
    following: Option<Weak<RefCell<Shared<T, E>>>>,
    release: fn(Reactions<T, E>),
}

impl<T, E> Drop for Shared<T, E> {
    fn drop(&mut self) {
        if let Settlement::Pending(reactions) = &mut self.settlement {
            if !reactions.is_empty() {
                (self.release)(mem::take(reactions));
            }
        }
    }
}

thread_local! {
    static ORPHANS: RefCell<Vec<Box<dyn Any>>> = const { RefCell::new(Vec::new()) };
    static RELEASING: Cell<bool> = const { Cell::new(false) };
}

/// Drops the reactions of an abandoned pending promise.
///
/// Each reaction owns the promise derived from it, so dropping the head of a
/// long pending chain would otherwise recurse once per link. Nested drops
/// park their reactions in `ORPHANS` and the outermost call frees them in a
/// loop.
fn release_orphans<T: 'static, E: 'static>(reactions: Reactions<T, E>) {
    let batch: Box<dyn Any> = Box::new(reactions);
    if ORPHANS.try_with(|orphans| orphans.borrow_mut().push(batch)).is_err() {
        return;
    }
    if RELEASING.with(|releasing| releasing.replace(true)) {
        return;
    }
    let _guard = ReleaseGuard;
    while let Some(batch) = ORPHANS.with(|orphans| orphans.borrow_mut().pop()) {
        drop(batch);
    }
}

struct ReleaseGuard;

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        let _ = RELEASING.try_with(|releasing| releasing.set(false));
    }
}

/// A shared handle to an eventual value of type `T` or rejection reason of
/// type `E`.
///
/// Cloning the handle is cheap and every clone observes the same promise.
pub struct Promise<T, E> {
    shared: Rc<RefCell<Shared<T, E>>>,
}

/// A non-owning reference to a promise.
pub struct WeakPromise<T, E> {
    shared: Weak<RefCell<Shared<T, E>>>,
}

impl<T, E> WeakPromise<T, E> {
    /// Returns the promise if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Promise<T, E>> {
        self.shared.upgrade().map(|shared| Promise { shared })
    }
}

impl<T, E> Clone for WeakPromise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T, E> Promise<T, E> {
    /// The promise's identifier.
    #[must_use]
    pub fn id(&self) -> PromiseId {
        self.shared.borrow().id
    }

    /// True if both handles refer to the same promise.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// The current state, without the value.
    #[must_use]
    pub fn state(&self) -> State {
        match self.shared.borrow().settlement {
            Settlement::Pending(_) => State::Pending,
            Settlement::Fulfilled(_) => State::Fulfilled,
            Settlement::Rejected(_) => State::Rejected,
        }
    }

    /// A weak handle that does not keep the promise alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakPromise<T, E> {
        WeakPromise {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.shared.borrow().resolved
    }

    /// Marks the promise as resolved. Returns false if it already was.
    pub(crate) fn begin_resolution(&self) -> bool {
        !mem::replace(&mut self.shared.borrow_mut().resolved, true)
    }

    pub(crate) fn has_cancel_hook(&self) -> bool {
        self.shared.borrow().cancel.is_some()
    }

    pub(crate) fn set_cancel_hook(&self, hook: CancelHook<E>) {
        self.shared.borrow_mut().cancel = Some(hook);
    }

    fn cancel_hook(&self) -> Option<CancelHook<E>> {
        self.shared.borrow().cancel.clone()
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub(crate) fn pending(origin: Origin, cancel: Option<CancelHook<E>>) -> Self {
        Self::from_settlement(Settlement::Pending(SmallVec::new()), false, origin, cancel)
    }

    fn from_settlement(
        settlement: Settlement<T, E>,
        resolved: bool,
        origin: Origin,
        cancel: Option<CancelHook<E>>,
    ) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                id: PromiseId::next(),
                settlement,
                resolved,
                origin,
                cancel,
                following: None,
                release: release_orphans::<T, E>,
            })),
        }
    }

    /// An already-fulfilled promise.
    #[must_use]
    pub fn fulfilled(value: T) -> Self {
        Self::from_settlement(Settlement::Fulfilled(value), true, Origin::Settled, None)
    }

    /// An already-rejected promise.
    #[must_use]
    pub fn rejected(reason: E) -> Self {
        Self::from_settlement(Settlement::Rejected(reason), true, Origin::Settled, None)
    }

    /// Runs `executor` with the resolver of a new promise.
    ///
    /// An `Err` returned by the executor rejects the promise, unless the
    /// executor already resolved it.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolver<T, E>) -> Result<(), E>,
    {
        let deferred = Deferred::new();
        if let Err(reason) = executor(deferred.resolver()) {
            deferred.reject(reason);
        }
        deferred.into_promise()
    }

    /// A promise for the given resolution.
    ///
    /// Adopting returns the promise itself rather than a follower.
    pub fn from_resolution(resolution: Resolution<T, E>) -> Self {
        match resolution {
            Resolution::Fulfill(value) => Self::fulfilled(value),
            Resolution::Reject(reason) => Self::rejected(reason),
            Resolution::Adopt(promise) => promise,
            Resolution::Assimilate(thenable) => thenable::assimilate(thenable),
        }
    }

    fn from_outcome(outcome: Result<T, E>) -> Self {
        match outcome {
            Ok(value) => Self::fulfilled(value),
            Err(reason) => Self::rejected(reason),
        }
    }

    /// Synchronous snapshot of the promise's state.
    #[must_use]
    pub fn inspect(&self) -> Snapshot<T, E> {
        match &self.shared.borrow().settlement {
            Settlement::Pending(_) => Snapshot::Pending,
            Settlement::Fulfilled(value) => Snapshot::Fulfilled(value.clone()),
            Settlement::Rejected(reason) => Snapshot::Rejected(reason.clone()),
        }
    }

    /// Requests cancellation of the deferred at the root of this chain.
    ///
    /// Returns true if the root was still unresolved and has now been
    /// rejected. Promises without a cancelable root return false.
    pub fn cancel(&self, reason: E) -> bool {
        self.cancel_hook().is_some_and(|hook| hook(reason))
    }

    pub(crate) fn subscribe(&self, reaction: Reaction<T, E>) {
        let outcome = {
            let mut shared = self.shared.borrow_mut();
            match &mut shared.settlement {
                Settlement::Pending(reactions) => {
                    reactions.push(reaction);
                    return;
                }
                Settlement::Fulfilled(value) => Ok(value.clone()),
                Settlement::Rejected(reason) => Err(reason.clone()),
            }
        };
        let settle = reaction.settle;
        runtime::enqueue(move || settle(outcome));
    }

    /// Attaches a no-op reaction so a rejection is not reported as unhandled.
    pub(crate) fn mark_handled(&self) {
        self.subscribe(Reaction::settled(|_| {}));
    }

    pub(crate) fn settle(&self, outcome: Result<T, E>) {
        let mut shared = self.shared.borrow_mut();
        let reactions = match &mut shared.settlement {
            Settlement::Pending(reactions) => mem::take(reactions),
            _ => return,
        };
        shared.settlement = match &outcome {
            Ok(value) => Settlement::Fulfilled(value.clone()),
            Err(reason) => Settlement::Rejected(reason.clone()),
        };
        shared.resolved = true;
        shared.following = None;
        let id = shared.id;
        let unhandled = outcome.is_err() && reactions.is_empty() && shared.origin == Origin::Derived;
        drop(shared);

        trace!(
            promise_id = %id,
            state = if outcome.is_ok() { "fulfilled" } else { "rejected" },
            queued = reactions.len(),
            "promise settled"
        );
        if unhandled {
            runtime::report_unhandled(id);
        }
        for reaction in reactions {
            let outcome = outcome.clone();
            let settle = reaction.settle;
            runtime::enqueue(move || settle(outcome));
        }
    }

    pub(crate) fn notify(&self, update: &Progress) {
        let listeners: SmallVec<[ProgressFn; 1]> = match &self.shared.borrow().settlement {
            Settlement::Pending(reactions) => reactions
                .iter()
                .filter_map(|reaction| reaction.progress.clone())
                .collect(),
            _ => return,
        };
        if listeners.is_empty() {
            return;
        }
        let update = update.clone();
        runtime::enqueue(move || {
            for listener in &listeners {
                listener(&update);
            }
        });
    }

    pub(crate) fn resolve_with(&self, resolution: Resolution<T, E>) {
        match resolution {
            Resolution::Fulfill(value) => self.settle(Ok(value)),
            Resolution::Reject(reason) => self.settle(Err(reason)),
            Resolution::Adopt(source) => self.adopt(&source),
            Resolution::Assimilate(thenable) => self.adopt(&thenable::assimilate(thenable)),
        }
    }

    fn adopt(&self, source: &Self) {
        if self.leads_back_to(source) {
            warn!(
                promise_id = %self.id(),
                source_id = %source.id(),
                "promise resolution forms a cycle, it will never settle"
            );
            return;
        }
        self.shared.borrow_mut().following = Some(Rc::downgrade(&source.shared));
        let target = self.clone();
        let relay = self.clone();
        source.subscribe(Reaction::new(
            move |outcome| target.settle(outcome),
            move |update| relay.notify(update),
        ));
    }

    /// True if adopting `source` would make this promise wait on itself.
    ///
    /// Cycles through foreign thenables are not detected.
    fn leads_back_to(&self, source: &Self) -> bool {
        let mut next = Some(Rc::clone(&source.shared));
        while let Some(shared) = next {
            if Rc::ptr_eq(&shared, &self.shared) {
                return true;
            }
            next = shared.borrow().following.as_ref().and_then(Weak::upgrade);
        }
        false
    }

    /// Registers `handler` and returns the promise it resolves.
    fn derive<U, H>(
        &self,
        handler: H,
        on_progress: Option<Box<dyn FnMut(&Progress)>>,
    ) -> Promise<U, E>
    where
        U: Clone + 'static,
        H: FnOnce(Result<T, E>) -> Resolution<U, E> + 'static,
    {
        let child = Promise::<U, E>::pending(Origin::Derived, self.cancel_hook());
        let relay = child.clone();
        let progress: ProgressFn = match on_progress {
            Some(observer) => {
                let observer = RefCell::new(observer);
                Rc::new(move |update: &Progress| {
                    (*observer.borrow_mut())(update);
                    relay.notify(update);
                })
            }
            None => Rc::new(move |update: &Progress| relay.notify(update)),
        };
        let target = child.clone();
        self.subscribe(Reaction {
            settle: Box::new(move |outcome| target.resolve_with(handler(outcome))),
            progress: Some(progress),
        });
        child
    }

    /// Applies `on_fulfilled` to the value. A rejection passes through.
    ///
    /// A handler that panics leaves the returned promise pending. The panic
    /// resurfaces from [`run_until_idle`](crate::runtime::run_until_idle)
    /// once the rest of the queue has drained.
    pub fn then<U, F, R>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
        R: IntoResolution<U, E>,
    {
        self.derive(
            move |outcome| match outcome {
                Ok(value) => on_fulfilled(value).into_resolution(),
                Err(reason) => Resolution::Reject(reason),
            },
            None,
        )
    }

    /// Applies `on_fulfilled` or `on_rejected`, whichever matches.
    pub fn then_or<U, F, R, G, S>(&self, on_fulfilled: F, on_rejected: G) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
        R: IntoResolution<U, E>,
        G: FnOnce(E) -> S + 'static,
        S: IntoResolution<U, E>,
    {
        self.derive(
            move |outcome| match outcome {
                Ok(value) => on_fulfilled(value).into_resolution(),
                Err(reason) => on_rejected(reason).into_resolution(),
            },
            None,
        )
    }

    /// [`then_or`](Self::then_or) with a progress observer.
    ///
    /// Updates are forwarded to the derived promise after `on_progress`
    /// has seen them.
    pub fn then_with<U, F, R, G, S, P>(
        &self,
        on_fulfilled: F,
        on_rejected: G,
        on_progress: P,
    ) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
        R: IntoResolution<U, E>,
        G: FnOnce(E) -> S + 'static,
        S: IntoResolution<U, E>,
        P: FnMut(&Progress) + 'static,
    {
        self.derive(
            move |outcome| match outcome {
                Ok(value) => on_fulfilled(value).into_resolution(),
                Err(reason) => on_rejected(reason).into_resolution(),
            },
            Some(Box::new(on_progress)),
        )
    }

    /// Handles a rejection. A fulfillment passes through.
    ///
    /// Returning `Ok` switches the chain back to fulfilled.
    pub fn otherwise<G, S>(&self, on_rejected: G) -> Self
    where
        G: FnOnce(E) -> S + 'static,
        S: IntoResolution<T, E>,
    {
        self.derive(
            move |outcome| match outcome {
                Ok(value) => Resolution::Fulfill(value),
                Err(reason) => on_rejected(reason).into_resolution(),
            },
            None,
        )
    }

    /// Observes progress updates. Both outcomes pass through.
    pub fn progress<P>(&self, on_progress: P) -> Self
    where
        P: FnMut(&Progress) + 'static,
    {
        self.derive(
            |outcome| match outcome {
                Ok(value) => Resolution::Fulfill(value),
                Err(reason) => Resolution::Reject(reason),
            },
            Some(Box::new(on_progress)),
        )
    }

    /// Runs `cleanup` on either outcome, then passes the outcome through.
    ///
    /// If `cleanup` fails, the returned promise rejects with its reason
    /// instead.
    pub fn ensure<F, R>(&self, cleanup: F) -> Self
    where
        F: FnOnce() -> R + 'static,
        R: IntoResolution<(), E>,
    {
        self.derive(
            move |outcome| {
                let source = Self::from_outcome(outcome);
                let done = Promise::<(), E>::from_resolution(cleanup().into_resolution());
                Resolution::Adopt(done.then(move |()| source))
            },
            None,
        )
    }

    /// Replaces the fulfillment value with `value`.
    pub fn yield_value<U>(&self, value: impl Into<Resolvable<U, E>>) -> Promise<U, E>
    where
        U: Clone + 'static,
    {
        let value = value.into();
        self.then(move |_| value)
    }

    /// Runs a side effect on the value and passes the value through.
    ///
    /// If the side effect returns a promise, the value is passed on once
    /// that promise fulfills; a failure rejects the returned promise.
    pub fn tap<F, R>(&self, on_fulfilled: F) -> Self
    where
        F: FnOnce(&T) -> R + 'static,
        R: IntoResolution<(), E>,
    {
        self.then(move |value: T| {
            let effect = Promise::<(), E>::from_resolution(on_fulfilled(&value).into_resolution());
            effect.then(move |()| Ok(value))
        })
    }

    /// Hands the outcome to a callback.
    ///
    /// The returned promise fulfills once the callback has run.
    pub fn callback<F>(&self, callback: F) -> Promise<(), E>
    where
        F: FnOnce(Result<T, E>) + 'static,
    {
        self.derive(
            move |outcome| {
                callback(outcome);
                Resolution::Fulfill(())
            },
            None,
        )
    }

    /// Runs `on_settled` on either outcome; its result resolves the returned
    /// promise.
    pub fn always<U, F, R>(&self, on_settled: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(Result<T, E>) -> R + 'static,
        R: IntoResolution<U, E>,
    {
        self.derive(move |outcome| on_settled(outcome).into_resolution(), None)
    }

    /// Terminal form of [`then`](Self::then).
    ///
    /// # Panics
    ///
    /// Panics from inside the task queue drain if the promise rejects or
    /// `on_fulfilled` returns `Err`.
    pub fn done<F>(&self, on_fulfilled: F)
    where
        F: FnOnce(T) -> Result<(), E> + 'static,
    {
        self.finish(
            move |outcome| match outcome {
                Ok(value) => on_fulfilled(value),
                Err(reason) => Err(reason),
            },
            None,
        );
    }

    /// Terminal form of [`then_or`](Self::then_or).
    ///
    /// # Panics
    ///
    /// Panics from inside the task queue drain if the matching handler
    /// returns `Err`.
    pub fn done_or<F, G>(&self, on_fulfilled: F, on_rejected: G)
    where
        F: FnOnce(T) -> Result<(), E> + 'static,
        G: FnOnce(E) -> Result<(), E> + 'static,
    {
        self.finish(
            move |outcome| match outcome {
                Ok(value) => on_fulfilled(value),
                Err(reason) => on_rejected(reason),
            },
            None,
        );
    }

    /// Terminal form of [`then_with`](Self::then_with).
    ///
    /// # Panics
    ///
    /// Panics from inside the task queue drain if the matching handler
    /// returns `Err`.
    pub fn done_with<F, G, P>(&self, on_fulfilled: F, on_rejected: G, on_progress: P)
    where
        F: FnOnce(T) -> Result<(), E> + 'static,
        G: FnOnce(E) -> Result<(), E> + 'static,
        P: Fn(&Progress) + 'static,
    {
        self.finish(
            move |outcome| match outcome {
                Ok(value) => on_fulfilled(value),
                Err(reason) => on_rejected(reason),
            },
            Some(Rc::new(on_progress)),
        );
    }

    fn finish<H>(&self, handler: H, progress: Option<ProgressFn>)
    where
        H: FnOnce(Result<T, E>) -> Result<(), E> + 'static,
    {
        let id = self.id();
        self.subscribe(Reaction {
            settle: Box::new(move |outcome| {
                if handler(outcome).is_err() {
                    error!(promise_id = %id, "rejection reached done()");
                    panic!("unhandled rejection reached done() on promise {id}");
                }
            }),
            progress,
        });
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        let mut out = f.debug_struct("Promise");
        out.field("id", &shared.id);
        match &shared.settlement {
            Settlement::Pending(reactions) => out
                .field("state", &State::Pending)
                .field("reactions", &reactions.len()),
            Settlement::Fulfilled(value) => out.field("value", value),
            Settlement::Rejected(reason) => out.field("reason", reason),
        };
        out.finish()
    }
}

impl<T, E> fmt::Debug for WeakPromise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakPromise(..)")
    }
}
