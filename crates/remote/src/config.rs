//! Client configuration, with environment overrides.

use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::policy::{CircuitBreakerConfig, RetryPolicy};

/// Default per-attempt deadline.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(1);

/// Default lifetime of cached reference data.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Settings shared by every remote source client.
#[derive(Clone, Debug)]
pub struct SourceClientConfig {
    /// Deadline applied to each attempt.
    pub deadline: Duration,
    pub retry: RetryPolicy,
    pub circuit_breaker: CircuitBreakerConfig,
    /// Time-to-live for read-through cache entries.
    pub cache_ttl: Duration,
}

impl Default for SourceClientConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            retry: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl SourceClientConfig {
    /// Build from `CAMPUS_*` environment variables, falling back to defaults.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `CAMPUS_REMOTE_DEADLINE_MS` | per-attempt deadline |
    /// | `CAMPUS_REMOTE_MAX_ATTEMPTS` | attempts including the first |
    /// | `CAMPUS_REMOTE_BACKOFF_MS` | initial backoff |
    /// | `CAMPUS_REMOTE_MAX_BACKOFF_MS` | backoff cap |
    /// | `CAMPUS_BREAKER_FAILURE_THRESHOLD` | failures in window before opening |
    /// | `CAMPUS_BREAKER_FAILURE_RATE` | failure rate (0.0 to 1.0) before opening |
    /// | `CAMPUS_BREAKER_WINDOW_MS` | rolling window length |
    /// | `CAMPUS_BREAKER_COOL_DOWN_MS` | time in Open before the probe |
    /// | `CAMPUS_CACHE_TTL_SECS` | reference data cache lifetime |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            deadline: env_millis("CAMPUS_REMOTE_DEADLINE_MS", defaults.deadline),
            retry: RetryPolicy {
                max_attempts: env_parse("CAMPUS_REMOTE_MAX_ATTEMPTS", defaults.retry.max_attempts),
                initial_backoff: env_millis(
                    "CAMPUS_REMOTE_BACKOFF_MS",
                    defaults.retry.initial_backoff,
                ),
                max_backoff: env_millis("CAMPUS_REMOTE_MAX_BACKOFF_MS", defaults.retry.max_backoff),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: env_parse(
                    "CAMPUS_BREAKER_FAILURE_THRESHOLD",
                    defaults.circuit_breaker.failure_threshold,
                ),
                failure_rate_threshold: env_parse(
                    "CAMPUS_BREAKER_FAILURE_RATE",
                    defaults.circuit_breaker.failure_rate_threshold,
                )
                .clamp(0.0, 1.0),
                window: env_millis("CAMPUS_BREAKER_WINDOW_MS", defaults.circuit_breaker.window),
                cool_down: env_millis(
                    "CAMPUS_BREAKER_COOL_DOWN_MS",
                    defaults.circuit_breaker.cool_down,
                ),
            },
            cache_ttl: Duration::from_secs(env_parse(
                "CAMPUS_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )),
        }
    }
}

/// Read and parse an environment variable, keeping the default when unset or malformed.
pub fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring malformed {}={:?}, using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Read a millisecond duration from the environment.
pub fn env_millis(name: &str, default: Duration) -> Duration {
    Duration::from_millis(env_parse(name, default.as_millis() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SourceClientConfig::default();
        assert_eq!(config.deadline, Duration::from_secs(1));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
    }

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        std::env::set_var("CAMPUS_TEST_GARBAGE_ATTEMPTS", "three");
        assert_eq!(env_parse("CAMPUS_TEST_GARBAGE_ATTEMPTS", 3u32), 3);

        std::env::set_var("CAMPUS_TEST_GOOD_ATTEMPTS", " 7 ");
        assert_eq!(env_parse("CAMPUS_TEST_GOOD_ATTEMPTS", 3u32), 7);

        assert_eq!(
            env_millis("CAMPUS_TEST_UNSET_DEADLINE_MS", Duration::from_millis(250)),
            Duration::from_millis(250)
        );
    }
}
