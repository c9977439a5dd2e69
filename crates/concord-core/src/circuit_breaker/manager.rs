use super::{
    breaker::{BreakerSnapshot, CircuitBreaker},
    config::CircuitBreakerConfig,
};
use crate::errors::BreakerError;
use dashmap::DashMap;
use std::{collections::BTreeMap, future::Future, sync::Arc};
use tracing::{debug, info};

/// Keyed registry of circuit breakers.
///
/// Breakers are created lazily on first use and live for the manager's lifetime. The manager
/// is an ordinary value: construct one and share it through an `Arc` with every component that
/// needs fault isolation.
pub struct CircuitBreakerManager {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    default_config: CircuitBreakerConfig,
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreakerManager {
    #[must_use]
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self { breakers: DashMap::new(), default_config }
    }

    /// Returns the breaker for `name`, creating it with the default profile if needed.
    #[must_use]
    pub fn get_breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        self.get_breaker_with_config(name, &self.default_config)
    }

    /// Returns the breaker for `name`, creating it with `config` if needed.
    ///
    /// An existing breaker keeps the configuration it was created with.
    #[must_use]
    pub fn get_breaker_with_config(
        &self,
        name: &str,
        config: &CircuitBreakerConfig,
    ) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.get(name) {
            return Arc::clone(breaker.value());
        }

        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(breaker = %name, "creating circuit breaker");
                Arc::new(CircuitBreaker::new(name, config.clone()))
            })
            .clone()
    }

    /// Runs `operation` under the breaker named `name` using the default profile.
    ///
    /// # Errors
    ///
    /// Returns [`BreakerError::Open`] without invoking `operation` when the breaker refuses the
    /// call, or [`BreakerError::ExecutionFailed`] wrapping the operation's error after recording
    /// the failure.
    pub async fn execute_with_breaker<F, Fut, T, E>(
        &self,
        name: &str,
        operation: F,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let breaker = self.get_breaker(name);
        Self::run_protected(&breaker, operation).await
    }

    /// Runs `operation` under the breaker named `name`, creating it with `config` if needed.
    ///
    /// # Errors
    ///
    /// Same as [`execute_with_breaker`](Self::execute_with_breaker).
    pub async fn execute_with_config<F, Fut, T, E>(
        &self,
        name: &str,
        config: &CircuitBreakerConfig,
        operation: F,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let breaker = self.get_breaker_with_config(name, config);
        Self::run_protected(&breaker, operation).await
    }

    /// The permit is held across the operation, so a caller that drops this future mid-call
    /// gives its half-open slot back instead of leaking it.
    async fn run_protected<F, Fut, T, E>(
        breaker: &CircuitBreaker,
        operation: F,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(permit) = breaker.acquire().await else {
            crate::metrics::record_breaker_rejection(breaker.name());
            return Err(BreakerError::Open { name: breaker.name().to_string() });
        };

        match operation().await {
            Ok(value) => {
                breaker.record_success().await;
                permit.complete();
                Ok(value)
            }
            Err(source) => {
                breaker.record_failure().await;
                permit.complete();
                Err(BreakerError::ExecutionFailed { name: breaker.name().to_string(), source })
            }
        }
    }

    /// Snapshots every breaker, ordered by name.
    pub async fn get_all_states(&self) -> BTreeMap<String, BreakerSnapshot> {
        // Collect first so no shard guard is held across an await point.
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|entry| Arc::clone(entry.value())).collect();

        let mut states = BTreeMap::new();
        for breaker in breakers {
            states.insert(breaker.name().to_string(), breaker.snapshot().await);
        }
        states
    }

    /// Resets a single breaker. Returns `false` if no breaker with that name exists.
    pub async fn reset_breaker(&self, name: &str) -> bool {
        let Some(breaker) = self.breakers.get(name).map(|entry| Arc::clone(entry.value())) else {
            return false;
        };
        breaker.reset().await;
        true
    }

    pub async fn reset_all(&self) {
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|entry| Arc::clone(entry.value())).collect();
        for breaker in &breakers {
            breaker.reset().await;
        }
        info!(count = breakers.len(), "reset all circuit breakers");
    }

    #[must_use]
    pub fn breaker_count(&self) -> usize {
        self.breakers.len()
    }
}
