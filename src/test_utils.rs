//! Test utilities for vow.
//!
//! This module provides shared helpers for unit tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Task queue constructors with a chosen rejection policy
//! - Snapshot assertion macros
//!
//! # Example
//! ```ignore
//! use crate::test_utils::{init_test_logging, lenient_queue};
//!
//! fn my_test() {
//!     init_test_logging();
//!     let queue = lenient_queue();
//!     // promise code
//!     queue.run_until_idle();
//! }
//! ```

use std::rc::Rc;
use std::sync::{Mutex, Once};

use tracing_subscriber::fmt::format::FmtSpan;

use crate::runtime::{QueueConfig, TaskQueue, UnhandledRejection};

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Install a fresh queue on this thread with the given rejection policy.
pub fn install_queue(policy: UnhandledRejection) -> Rc<TaskQueue> {
    TaskQueue::new(QueueConfig::default().with_unhandled_rejection(policy)).install()
}

/// Install a fresh queue that only logs unhandled rejections.
pub fn lenient_queue() -> Rc<TaskQueue> {
    install_queue(UnhandledRejection::Log)
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// Assert that a promise is fulfilled with a specific value.
#[macro_export]
macro_rules! assert_fulfilled {
    ($promise:expr, $expected:expr) => {
        match $promise.inspect() {
            $crate::Snapshot::Fulfilled(v) => assert_eq!(v, $expected),
            other => unreachable!("expected Fulfilled({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that a promise is rejected with a specific reason.
#[macro_export]
macro_rules! assert_rejected {
    ($promise:expr, $expected:expr) => {
        match $promise.inspect() {
            $crate::Snapshot::Rejected(r) => assert_eq!(r, $expected),
            other => unreachable!("expected Rejected({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that a promise is still pending.
#[macro_export]
macro_rules! assert_pending {
    ($promise:expr) => {
        match $promise.inspect() {
            $crate::Snapshot::Pending => {}
            other => unreachable!("expected Pending, got {:?}", other),
        }
    };
}
