//! Core types shared across the crate.
//!
//! - [`PromiseId`]: identifiers for promise cells
//! - [`Snapshot`] and [`State`]: synchronous views of settlement
//! - [`Progress`]: type-erased progress updates

pub mod id;
pub mod snapshot;

pub use id::PromiseId;
pub use snapshot::{Progress, Snapshot, State};
