//! Vow: single-threaded promises for Rust.
//!
//! # Overview
//!
//! A [`Promise`] is an eventual value: pending until its [`Deferred`] settles
//! it, then fulfilled with a value or rejected with a reason, exactly once.
//! Continuations attached with [`Promise::then`] and friends always run from
//! the thread's [`TaskQueue`], never on the stack that attached them or that
//! settled the promise.
//!
//! # Core Guarantees
//!
//! - **Single settlement**: only the first resolve/reject of a deferred counts
//! - **Asynchronous handlers**: handlers on settled promises still wait for the queue
//! - **Ordering**: handlers on one promise run in registration order; the queue is FIFO
//! - **Flattening**: a promise never fulfills with another promise
//! - **Loud failures**: rejections nobody handles are reported, fatally by default
//!
//! # Module Structure
//!
//! - [`promise`]: the state machine, deferreds, resolution and assimilation
//! - [`runtime`]: the task queue, its configuration and [`block_on`]
//! - [`combinator`]: `all`, `map`, `reduce`, `any`, `some`, `join`, `chain`
//! - [`func`]: adapters calling plain functions with promised arguments
//! - [`types`]: identifiers, snapshots and progress updates
//! - [`error`]: error types
//!
//! # Example
//!
//! ```
//! use vow::{all, block_on, defer, Deferred, Promise, Resolvable};
//!
//! let d: Deferred<i32, String> = defer();
//! let total = all(vec![
//!     Resolvable::Value(1),
//!     Resolvable::from(d.promise()),
//!     Resolvable::from(Promise::fulfilled(3)),
//! ])
//! .then(|xs| Ok(xs.iter().sum::<i32>()));
//!
//! d.resolve(Resolvable::Value(2));
//! assert_eq!(block_on(&total).unwrap(), Ok(6));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

pub mod combinator;
pub mod error;
pub mod func;
pub mod promise;
pub mod runtime;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use combinator::{
    all, all_of, any, chain, chain_with, join, map, map_of, map_with, reduce, settle, some,
};
pub use error::{ConfigError, Error, Result};
pub use promise::{
    defer, is_promise, reject, resolve, when, Deferred, IntoResolution, Promise, Resolution,
    Resolvable, Resolver, Settled, Thenable, WeakPromise,
};
pub use runtime::{block_on, QueueConfig, TaskQueue, UnhandledRejection};
pub use types::{Progress, PromiseId, Snapshot, State};
