//! Error types for the crate's own failure modes.
//!
//! Rejections are not Rust errors: a handler that fails returns `Err(reason)`
//! and the reason travels down the promise chain as a value of the chain's
//! reason type `E`. The types here cover the few places where the library
//! itself can fail:
//!
//! - **Scheduling**: a promise is still pending after the task queue went idle
//! - **Configuration**: an environment override could not be parsed

use thiserror::Error;

use crate::types::PromiseId;

/// Errors raised while reading queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable was set to a value that does not parse.
    #[error("invalid value for {var}: expected {expected}, got {value:?}")]
    InvalidValue {
        /// The variable name.
        var: &'static str,
        /// The raw value found in the environment.
        value: String,
        /// Human readable description of the accepted values.
        expected: &'static str,
    },
}

/// The main error type for `vow` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The task queue drained completely but the promise never settled.
    ///
    /// Nothing left in the queue can settle it; whoever owns its resolver
    /// must act from outside the queue.
    #[error("promise {promise} is still pending after the task queue went idle")]
    Stalled {
        /// The promise that was awaited.
        promise: PromiseId,
    },
    /// Queue configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Returns true if this error reports a stalled promise.
    #[must_use]
    pub const fn is_stalled(&self) -> bool {
        matches!(self, Self::Stalled { .. })
    }
}

/// A specialized Result type for `vow` operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stalled_display_names_promise() {
        let err = Error::Stalled {
            promise: PromiseId::new_for_test(12),
        };
        assert!(err.is_stalled());
        assert_eq!(
            err.to_string(),
            "promise P12 is still pending after the task queue went idle"
        );
    }

    #[test]
    fn config_error_converts() {
        let err: Error = ConfigError::InvalidValue {
            var: "VOW_QUEUE_CAPACITY",
            value: "lots".into(),
            expected: "unsigned integer",
        }
        .into();
        assert!(!err.is_stalled());
        assert!(err.to_string().contains("VOW_QUEUE_CAPACITY"));
        assert!(err.to_string().contains("\"lots\""));
    }
}
