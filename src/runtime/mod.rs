//! Scheduling for promise continuations.
//!
//! - [`TaskQueue`]: the per-thread FIFO of continuations
//! - [`NextTick`]: hook telling the host a drain is needed
//! - [`QueueConfig`]: queue settings, with `VOW_*` environment overrides
//! - [`block_on`]: drain the current queue and read a promise's outcome

pub mod config;
pub mod env_config;
pub mod queue;

pub use config::{QueueConfig, UnhandledRejection};
pub use queue::{CountingTick, ManualTick, NextTick, TaskQueue};

use tracing::error;

use crate::error::Error;
use crate::promise::Promise;
use crate::types::{PromiseId, Snapshot};

/// Enqueues a task on the current thread's queue.
pub fn enqueue(task: impl FnOnce() + 'static) {
    TaskQueue::current().enqueue(Box::new(task));
}

/// Drains the current thread's queue. Returns the number of tasks run.
pub fn run_until_idle() -> usize {
    TaskQueue::current().run_until_idle()
}

/// Drains the current queue and returns the promise's outcome.
///
/// The promise counts as handled, so a rejection here is never reported as
/// unhandled. If the queue goes idle while the promise is still pending,
/// returns [`Error::Stalled`].
pub fn block_on<T, E>(promise: &Promise<T, E>) -> Result<Result<T, E>, Error>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    promise.mark_handled();
    run_until_idle();
    match promise.inspect() {
        Snapshot::Fulfilled(value) => Ok(Ok(value)),
        Snapshot::Rejected(reason) => Ok(Err(reason)),
        Snapshot::Pending => Err(Error::Stalled {
            promise: promise.id(),
        }),
    }
}

/// Applies the current queue's policy to a rejection nobody observed.
pub(crate) fn report_unhandled(id: PromiseId) {
    match TaskQueue::current().config().unhandled_rejection {
        UnhandledRejection::Panic => {
            error!(promise_id = %id, "unhandled promise rejection");
            panic!("unhandled rejection of promise {id}");
        }
        UnhandledRejection::Log => {
            error!(promise_id = %id, "unhandled promise rejection");
        }
        UnhandledRejection::Silent => {}
    }
}
