//! What a promise can be resolved with.
//!
//! [`Resolvable`] is the caller-facing "value or promise" input accepted by
//! [`resolve`](crate::resolve), [`Resolver::resolve`](crate::Resolver::resolve)
//! and the combinators. [`Resolution`] is the engine-facing instruction a
//! handler's return value is converted into, through [`IntoResolution`].

use std::fmt;
use std::rc::Rc;

use crate::promise::thenable::Thenable;
use crate::promise::Promise;

/// A plain value, a trusted promise, or a foreign thenable.
pub enum Resolvable<T, E> {
    /// A plain value; resolves to an already-fulfilled promise.
    Value(T),
    /// A promise from this crate; used as-is.
    Promise(Promise<T, E>),
    /// A foreign thenable; assimilated by calling its `then` once.
    Thenable(Rc<dyn Thenable<T, E>>),
}

impl<T, E> Resolvable<T, E> {
    /// Wraps a foreign thenable.
    pub fn thenable(thenable: impl Thenable<T, E> + 'static) -> Self {
        Self::Thenable(Rc::new(thenable))
    }

    /// True if this is a trusted promise or a thenable.
    #[must_use]
    pub const fn is_promise(&self) -> bool {
        matches!(self, Self::Promise(_) | Self::Thenable(_))
    }
}

/// True if `x` exposes `then`, i.e. it is a promise or a foreign thenable.
#[must_use]
pub const fn is_promise<T, E>(x: &Resolvable<T, E>) -> bool {
    x.is_promise()
}

impl<T: Clone, E> Clone for Resolvable<T, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Promise(promise) => Self::Promise(promise.clone()),
            Self::Thenable(thenable) => Self::Thenable(Rc::clone(thenable)),
        }
    }
}

impl<T, E> From<Promise<T, E>> for Resolvable<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Self::Promise(promise)
    }
}

impl<T, E> From<&Promise<T, E>> for Resolvable<T, E> {
    fn from(promise: &Promise<T, E>) -> Self {
        Self::Promise(promise.clone())
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolvable<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Promise(promise) => f.debug_tuple("Promise").field(&promise.id()).finish(),
            Self::Thenable(_) => f.write_str("Thenable(..)"),
        }
    }
}

/// How a promise is to be settled.
pub enum Resolution<T, E> {
    /// Fulfill with a value.
    Fulfill(T),
    /// Reject with a reason.
    Reject(E),
    /// Follow another promise and take on its eventual state.
    Adopt(Promise<T, E>),
    /// Assimilate a foreign thenable, then follow it.
    Assimilate(Rc<dyn Thenable<T, E>>),
}

impl<T, E> From<Resolvable<T, E>> for Resolution<T, E> {
    fn from(x: Resolvable<T, E>) -> Self {
        match x {
            Resolvable::Value(value) => Self::Fulfill(value),
            Resolvable::Promise(promise) => Self::Adopt(promise),
            Resolvable::Thenable(thenable) => Self::Assimilate(thenable),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fulfill(value) => f.debug_tuple("Fulfill").field(value).finish(),
            Self::Reject(reason) => f.debug_tuple("Reject").field(reason).finish(),
            Self::Adopt(promise) => f.debug_tuple("Adopt").field(&promise.id()).finish(),
            Self::Assimilate(_) => f.write_str("Assimilate(..)"),
        }
    }
}

/// Conversion of a handler's return value into a [`Resolution`].
///
/// `Err` is how a handler "throws": the derived promise rejects with it.
pub trait IntoResolution<T, E> {
    /// Performs the conversion.
    fn into_resolution(self) -> Resolution<T, E>;
}

impl<T, E> IntoResolution<T, E> for Result<T, E> {
    fn into_resolution(self) -> Resolution<T, E> {
        match self {
            Ok(value) => Resolution::Fulfill(value),
            Err(reason) => Resolution::Reject(reason),
        }
    }
}

impl<T, E> IntoResolution<T, E> for Promise<T, E> {
    fn into_resolution(self) -> Resolution<T, E> {
        Resolution::Adopt(self)
    }
}

impl<T, E> IntoResolution<T, E> for Resolvable<T, E> {
    fn into_resolution(self) -> Resolution<T, E> {
        self.into()
    }
}

impl<T, E> IntoResolution<T, E> for Resolution<T, E> {
    fn into_resolution(self) -> Resolution<T, E> {
        self
    }
}
