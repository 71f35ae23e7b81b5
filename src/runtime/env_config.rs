//! Environment variable support for [`QueueConfig`].
//!
//! # Configuration Precedence
//!
//! 1. **Programmatic**: a queue installed with [`TaskQueue::install`](super::TaskQueue::install)
//! 2. **Environment variables**: values from `VOW_*` env vars
//! 3. **Defaults**: [`QueueConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `VOW_UNHANDLED_REJECTION` | `panic` / `log` / `silent` | `unhandled_rejection` |
//! | `VOW_QUEUE_CAPACITY` | `usize` | `initial_capacity` |

use crate::error::ConfigError;
use crate::runtime::config::{QueueConfig, UnhandledRejection};

/// Environment variable name for the unhandled rejection policy.
pub const ENV_UNHANDLED_REJECTION: &str = "VOW_UNHANDLED_REJECTION";
/// Environment variable name for the initial queue capacity.
pub const ENV_QUEUE_CAPACITY: &str = "VOW_QUEUE_CAPACITY";

/// Apply environment variable overrides to a [`QueueConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut QueueConfig) -> Result<(), ConfigError> {
    apply_overrides_from(config, read_env)
}

/// Apply overrides using an arbitrary variable lookup.
///
/// [`apply_env_overrides`] calls this with the process environment.
pub fn apply_overrides_from<F>(config: &mut QueueConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(ENV_UNHANDLED_REJECTION) {
        config.unhandled_rejection = parse_policy(ENV_UNHANDLED_REJECTION, &val)?;
    }
    if let Some(val) = lookup(ENV_QUEUE_CAPACITY) {
        config.initial_capacity = parse_usize(ENV_QUEUE_CAPACITY, &val)?;
    }
    Ok(())
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var: &'static str, val: &str) -> Result<usize, ConfigError> {
    val.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidValue {
            var,
            value: val.to_owned(),
            expected: "unsigned integer",
        })
}

fn parse_policy(var: &'static str, val: &str) -> Result<UnhandledRejection, ConfigError> {
    val.parse().map_err(|()| ConfigError::InvalidValue {
        var,
        value: val.to_owned(),
        expected: "one of panic, log, silent",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn no_vars_leaves_defaults() {
        let mut config = QueueConfig::default();
        apply_overrides_from(&mut config, lookup_in(&[])).expect("no overrides");
        assert_eq!(config, QueueConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let mut config = QueueConfig::default();
        apply_overrides_from(
            &mut config,
            lookup_in(&[
                (ENV_UNHANDLED_REJECTION, "log"),
                (ENV_QUEUE_CAPACITY, " 256 "),
            ]),
        )
        .expect("valid overrides");
        assert_eq!(config.unhandled_rejection, UnhandledRejection::Log);
        assert_eq!(config.initial_capacity, 256);
    }

    #[test]
    fn bad_capacity_is_reported() {
        let mut config = QueueConfig::default();
        let err = apply_overrides_from(&mut config, lookup_in(&[(ENV_QUEUE_CAPACITY, "-3")]))
            .expect_err("negative capacity");
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: ENV_QUEUE_CAPACITY,
                value: "-3".into(),
                expected: "unsigned integer",
            }
        );
    }

    #[test]
    fn bad_policy_is_reported() {
        let mut config = QueueConfig::default();
        let err = apply_overrides_from(
            &mut config,
            lookup_in(&[(ENV_UNHANDLED_REJECTION, "explode")]),
        )
        .expect_err("unknown policy");
        assert!(err.to_string().contains(ENV_UNHANDLED_REJECTION));
    }
}
