//! Redundancy configuration types and defaults.

use crate::circuit_breaker::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for hedging, n-version execution and voting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedundancyConfig {
    /// Start delay for each hedged call in milliseconds, one entry per launched provider
    /// (default: `[0, 150, 500]`)
    #[serde(default = "default_hedge_delays_ms")]
    pub hedge_delays_ms: Vec<u64>,

    /// Versions expected from an n-version run before a warning is logged (default: 3)
    #[serde(default = "default_min_versions")]
    pub min_versions: usize,

    /// Versions below this confidence are ignored by the vote unless none qualify (default: 0.5)
    #[serde(default = "default_vote_confidence_threshold")]
    pub vote_confidence_threshold: f64,

    // ─── Full strategy ───
    /// Providers consulted by the full strategy (default: 5)
    #[serde(default = "default_full_max_providers")]
    pub full_max_providers: usize,

    /// Vote confidence below which a hedged confirmation is attempted (default: 0.7)
    #[serde(default = "default_confirmation_threshold")]
    pub confirmation_threshold: f64,

    /// Multiplier applied to the confirmation's confidence, capped at 1.0 (default: 1.1)
    #[serde(default = "default_confirmation_boost")]
    pub confirmation_boost: f64,

    /// Breaker profile applied to every provider, keyed `provider_<name>`
    #[serde(default)]
    pub breaker: CircuitBreakerConfig,

    // ─── Latency tracking ───
    /// Latency samples kept per provider (default: 100)
    #[serde(default = "default_latency_window")]
    pub latency_window: usize,

    /// Samples a provider needs before it contributes to delay adaptation (default: 10)
    #[serde(default = "default_adapt_min_samples")]
    pub adapt_min_samples: usize,
}

fn default_hedge_delays_ms() -> Vec<u64> {
    vec![0, 150, 500]
}

fn default_min_versions() -> usize {
    3
}

fn default_vote_confidence_threshold() -> f64 {
    0.5
}

fn default_full_max_providers() -> usize {
    5
}

fn default_confirmation_threshold() -> f64 {
    0.7
}

fn default_confirmation_boost() -> f64 {
    1.1
}

fn default_latency_window() -> usize {
    100
}

fn default_adapt_min_samples() -> usize {
    10
}

impl Default for RedundancyConfig {
    fn default() -> Self {
        Self {
            hedge_delays_ms: default_hedge_delays_ms(),
            min_versions: default_min_versions(),
            vote_confidence_threshold: default_vote_confidence_threshold(),
            full_max_providers: default_full_max_providers(),
            confirmation_threshold: default_confirmation_threshold(),
            confirmation_boost: default_confirmation_boost(),
            breaker: CircuitBreakerConfig::default(),
            latency_window: default_latency_window(),
            adapt_min_samples: default_adapt_min_samples(),
        }
    }
}

impl RedundancyConfig {
    #[must_use]
    pub fn hedge_delays(&self) -> Vec<Duration> {
        self.hedge_delays_ms.iter().copied().map(Duration::from_millis).collect()
    }

    /// # Errors
    ///
    /// Returns a descriptive error string if a value is out of range.
    pub fn validate(&self) -> Result<(), String> {
        if self.hedge_delays_ms.is_empty() {
            return Err("Redundancy hedge_delays_ms must not be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.vote_confidence_threshold) {
            return Err("Redundancy vote_confidence_threshold must be in [0, 1]".to_string());
        }
        if self.full_max_providers == 0 {
            return Err("Redundancy full_max_providers must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.confirmation_threshold) {
            return Err("Redundancy confirmation_threshold must be in [0, 1]".to_string());
        }
        if !self.confirmation_boost.is_finite() || self.confirmation_boost < 1.0 {
            return Err("Redundancy confirmation_boost must be at least 1.0".to_string());
        }
        if self.latency_window == 0 {
            return Err("Redundancy latency_window must be greater than 0".to_string());
        }
        self.breaker.validate()
    }
}
