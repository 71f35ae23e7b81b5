//! Combinators over collections of promises and values.
//!
//! This module provides:
//!
//! - [`join`](mod@join): wait for every input ([`all`], [`all_of`], [`join()`],
//!   [`settle`]),
//!   and forward one outcome into a deferred ([`chain`], [`chain_with`])
//! - [`map_reduce`]: concurrent [`map`], [`map_with`] and [`map_of`], and
//!   sequential [`reduce`]
//! - [`quorum`]: [`some`], the first `count` fulfillments
//! - [`race`]: [`any`], the first fulfillment
//!
//! Every input may be a plain value, a promise or a foreign thenable. Each
//! combinator returns a promise owned by a fresh deferred, so its result may
//! be dropped without tripping the unhandled rejection policy.

pub mod join;
pub mod map_reduce;
pub mod quorum;
pub mod race;

pub use join::{all, all_of, chain, chain_with, join, settle};
pub use map_reduce::{map, map_of, map_with, reduce};
pub use quorum::some;
pub use race::any;
