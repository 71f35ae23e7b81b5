//! The per-thread continuation queue.
//!
//! Every handler invocation in the crate goes through a [`TaskQueue`]: a
//! settlement never runs a continuation on the caller's stack, it enqueues a
//! task and returns. Tasks run in strict FIFO order when the queue is drained
//! with [`TaskQueue::run_until_idle`].
//!
//! The queue itself does not decide *when* to drain. When the first task
//! lands in an empty, idle queue it asks its [`NextTick`] hook for a drain;
//! the default hook ([`ManualTick`]) does nothing, so the embedding code
//! drains explicitly (an event loop turn, a test, or [`block_on`](super::block_on)).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{error, trace, warn};

use crate::runtime::config::QueueConfig;

type Task = Box<dyn FnOnce()>;

thread_local! {
    static CURRENT: RefCell<Option<Rc<TaskQueue>>> = const { RefCell::new(None) };
}

/// Hook invoked when work arrives in an idle queue.
///
/// Implementations typically post a callback to a host event loop that later
/// calls [`TaskQueue::run_until_idle`]. Requesting a drain must not run tasks
/// synchronously.
pub trait NextTick {
    /// Called once per transition from idle to non-empty.
    fn request_drain(&self);
}

/// A [`NextTick`] that does nothing; the owner drains by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualTick;

impl NextTick for ManualTick {
    fn request_drain(&self) {}
}

/// A [`NextTick`] that counts drain requests.
#[derive(Debug, Default)]
pub struct CountingTick {
    requests: Cell<usize>,
}

impl CountingTick {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of drain requests received so far.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.get()
    }
}

impl NextTick for CountingTick {
    fn request_drain(&self) {
        self.requests.set(self.requests.get() + 1);
    }
}

/// FIFO queue of pending continuations for one thread.
pub struct TaskQueue {
    tasks: RefCell<VecDeque<Task>>,
    draining: Cell<bool>,
    tick: Rc<dyn NextTick>,
    config: QueueConfig,
    executed: Cell<u64>,
}

impl TaskQueue {
    /// Creates a queue that is drained manually.
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        Self::with_tick(config, Rc::new(ManualTick))
    }

    /// Creates a queue that reports idle-to-busy transitions to `tick`.
    #[must_use]
    pub fn with_tick(config: QueueConfig, tick: Rc<dyn NextTick>) -> Self {
        Self {
            tasks: RefCell::new(VecDeque::with_capacity(config.initial_capacity)),
            draining: Cell::new(false),
            tick,
            config,
            executed: Cell::new(0),
        }
    }

    /// Makes this queue the current thread's queue, replacing any previous
    /// one. Tasks still sitting in the old queue stay there.
    pub fn install(self) -> Rc<Self> {
        let queue = Rc::new(self);
        let previous = CURRENT.with(|cur| cur.borrow_mut().replace(Rc::clone(&queue)));
        if let Some(previous) = previous {
            if !previous.is_quiescent() {
                warn!(
                    abandoned = previous.len(),
                    "task queue replaced while tasks were still pending"
                );
            }
        }
        queue
    }

    /// Returns the current thread's queue, creating it from
    /// [`QueueConfig::from_env`] on first use.
    pub fn current() -> Rc<Self> {
        if let Some(queue) = CURRENT.with(|cur| cur.borrow().clone()) {
            return queue;
        }
        let config = QueueConfig::from_env().unwrap_or_else(|err| {
            warn!(error = %err, "ignoring invalid queue configuration from environment");
            QueueConfig::default()
        });
        let queue = Rc::new(Self::new(config));
        CURRENT.with(|cur| *cur.borrow_mut() = Some(Rc::clone(&queue)));
        queue
    }

    /// Appends a task to the back of the queue.
    pub fn enqueue(&self, task: Box<dyn FnOnce()>) {
        let was_idle = {
            let mut tasks = self.tasks.borrow_mut();
            let was_empty = tasks.is_empty();
            tasks.push_back(task);
            was_empty && !self.draining.get()
        };
        if was_idle {
            self.tick.request_drain();
        }
    }

    /// Runs tasks until the queue is empty, including tasks enqueued by the
    /// tasks being run. Returns the number of tasks executed.
    ///
    /// A nested call from inside a running task returns `0` immediately;
    /// the outer drain picks up anything the task enqueued.
    ///
    /// # Panics
    ///
    /// If a task panics, the remaining tasks still run; the first panic is
    /// then resumed once the queue is idle.
    pub fn run_until_idle(&self) -> usize {
        if self.draining.replace(true) {
            return 0;
        }
        let guard = DrainGuard(&self.draining);
        let mut ran = 0usize;
        let mut panicked: Option<Box<dyn Any + Send>> = None;
        loop {
            let next = self.tasks.borrow_mut().pop_front();
            let Some(task) = next else { break };
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                error!(
                    task = self.executed.get() + ran as u64,
                    "task panicked, finishing the drain before resuming it"
                );
                panicked.get_or_insert(payload);
            }
            ran += 1;
        }
        self.executed.set(self.executed.get() + ran as u64);
        drop(guard);
        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }
        if ran > 0 {
            trace!(ran, "task queue idle");
        }
        ran
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// True when nothing is queued and no drain is in progress.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        !self.draining.get() && self.is_empty()
    }

    /// True while [`run_until_idle`](Self::run_until_idle) is executing.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.get()
    }

    /// The configuration this queue was built with.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Total tasks executed over the queue's lifetime.
    #[must_use]
    pub fn executed(&self) -> u64 {
        self.executed.get()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.len())
            .field("draining", &self.draining.get())
            .field("executed", &self.executed.get())
            .field("config", &self.config)
            .finish()
    }
}

/// Clears the draining flag when the drain ends.
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
