//! Circuit breaker tuning parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds and timeouts driving a single breaker's state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in `Closed` before the breaker opens (default: 3)
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Time in `Open` since the last failure before probing resumes, in milliseconds
    /// (default: 60000)
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,

    /// Maximum probe calls admitted while `HalfOpen` (default: 3)
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,

    /// Successful probes needed to close again (default: 2)
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_reset_timeout_ms() -> u64 {
    60_000
}

fn default_half_open_max_calls() -> u32 {
    3
}

fn default_success_threshold() -> u32 {
    2
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
            half_open_max_calls: default_half_open_max_calls(),
            success_threshold: default_success_threshold(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Tighter profile used for validators: trips after two failures and recovers after a
    /// single successful probe.
    #[must_use]
    pub fn validator_profile() -> Self {
        Self {
            failure_threshold: 2,
            reset_timeout_ms: 30_000,
            half_open_max_calls: 2,
            success_threshold: 1,
        }
    }

    #[must_use]
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    /// Checks that every threshold is usable.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("Circuit breaker failure_threshold must be greater than 0".to_string());
        }
        if self.half_open_max_calls == 0 {
            return Err("Circuit breaker half_open_max_calls must be greater than 0".to_string());
        }
        if self.success_threshold == 0 {
            return Err("Circuit breaker success_threshold must be greater than 0".to_string());
        }
        if self.success_threshold > self.half_open_max_calls {
            return Err(
                "Circuit breaker success_threshold cannot exceed half_open_max_calls".to_string()
            );
        }
        Ok(())
    }
}
