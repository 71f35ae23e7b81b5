//! Task queue configuration types.
//!
//! In most cases you should let [`TaskQueue::current`](super::TaskQueue::current)
//! build the queue from defaults and environment overrides, and only
//! construct a [`QueueConfig`] directly when installing a queue for tests or
//! embedding.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `unhandled_rejection` | `Panic` |
//! | `initial_capacity` | 64 |

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::runtime::env_config::apply_env_overrides;

/// Response policy when a derived promise rejects with nobody listening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnhandledRejection {
    /// Panic from inside the drain; the panic unwinds out of
    /// `run_until_idle`.
    #[default]
    Panic,
    /// Emit an error event and continue.
    Log,
    /// Drop the rejection on the floor.
    Silent,
}

impl std::str::FromStr for UnhandledRejection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "panic" => Ok(Self::Panic),
            "log" => Ok(Self::Log),
            "silent" | "ignore" => Ok(Self::Silent),
            _ => Err(()),
        }
    }
}

/// Task queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// What to do with rejections that reach the end of a `then` chain.
    pub unhandled_rejection: UnhandledRejection,
    /// Number of task slots reserved up front.
    pub initial_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            unhandled_rejection: UnhandledRejection::Panic,
            initial_capacity: 64,
        }
    }
}

impl QueueConfig {
    /// Builds the default configuration with `VOW_*` environment overrides
    /// applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Sets the unhandled rejection policy.
    #[must_use]
    pub const fn with_unhandled_rejection(mut self, policy: UnhandledRejection) -> Self {
        self.unhandled_rejection = policy;
        self
    }

    /// Sets the initial task capacity.
    #[must_use]
    pub const fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}
