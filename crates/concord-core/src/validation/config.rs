//! Validator pool configuration types and defaults.

use crate::circuit_breaker::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the validator pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorPoolConfig {
    /// Usable results required before a pooled verdict is issued (default: 3)
    #[serde(default = "default_quorum")]
    pub default_quorum: usize,

    /// Per-validator call timeout in milliseconds (default: 10000)
    #[serde(default = "default_validator_timeout_ms")]
    pub validator_timeout_ms: u64,

    /// Score above which a valid output counts as support (default: 0.7)
    #[serde(default = "default_support_score")]
    pub support_score: f64,

    /// Score below which an output counts as rejection (default: 0.3)
    #[serde(default = "default_reject_score")]
    pub reject_score: f64,

    /// Breaker profile applied to every validator, keyed `validator_<name>`
    #[serde(default = "CircuitBreakerConfig::validator_profile")]
    pub breaker: CircuitBreakerConfig,
}

fn default_quorum() -> usize {
    3
}

fn default_validator_timeout_ms() -> u64 {
    10_000
}

fn default_support_score() -> f64 {
    0.7
}

fn default_reject_score() -> f64 {
    0.3
}

impl Default for ValidatorPoolConfig {
    fn default() -> Self {
        Self {
            default_quorum: default_quorum(),
            validator_timeout_ms: default_validator_timeout_ms(),
            support_score: default_support_score(),
            reject_score: default_reject_score(),
            breaker: CircuitBreakerConfig::validator_profile(),
        }
    }
}

impl ValidatorPoolConfig {
    #[must_use]
    pub fn validator_timeout(&self) -> Duration {
        Duration::from_millis(self.validator_timeout_ms)
    }

    /// # Errors
    ///
    /// Returns a descriptive error string if a threshold is out of range.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_quorum == 0 {
            return Err("Validator default_quorum must be greater than 0".to_string());
        }
        if self.validator_timeout_ms == 0 {
            return Err("Validator timeout must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.reject_score) ||
            !(0.0..=1.0).contains(&self.support_score) ||
            self.reject_score > self.support_score
        {
            return Err(
                "Validator score thresholds must satisfy 0 <= reject_score <= support_score <= 1"
                    .to_string(),
            );
        }
        self.breaker.validate()
    }
}
