use super::config::CircuitBreakerConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Internal mutable state protected by a single `RwLock`.
///
/// Every counter and the state itself change together inside one write-lock acquisition, so a
/// transition can never be observed half-applied.
#[derive(Debug)]
struct BreakerInternalState {
    state: CircuitBreakerState,
    failure_count: u32,
    success_count: u32,
    half_open_calls: u32,
    /// Bumped on every `Open` -> `HalfOpen` transition so a late slot release cannot land in
    /// a later half-open window.
    half_open_epoch: u64,
    last_failure_time: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
}

impl BreakerInternalState {
    fn new() -> Self {
        Self {
            state: CircuitBreakerState::Closed,
            failure_count: 0,
            success_count: 0,
            half_open_calls: 0,
            half_open_epoch: 0,
            last_failure_time: None,
            last_failure_at: None,
        }
    }

    fn release_slot(&mut self, epoch: u64) -> bool {
        if self.state != CircuitBreakerState::HalfOpen
            || self.half_open_epoch != epoch
            || self.half_open_calls == 0
        {
            return false;
        }
        self.half_open_calls -= 1;
        true
    }

    fn reset_timeout_elapsed(&self, config: &CircuitBreakerConfig) -> bool {
        self.last_failure_time
            .is_some_and(|failed_at| failed_at.elapsed() >= config.reset_timeout())
    }

    fn mark_failure(&mut self) {
        self.last_failure_time = Some(Instant::now());
        self.last_failure_at = Some(Utc::now());
    }
}

/// Circuit breaker state machine.
///
/// - `Closed` -> `Open`: failure count reaches `failure_threshold`
/// - `Open` -> `HalfOpen`: `reset_timeout` elapsed since the last failure
/// - `HalfOpen` -> `Closed`: `success_threshold` successful probes
/// - `HalfOpen` -> `Open`: any failed probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitBreakerState {
    /// Normal operation, calls are allowed through.
    Closed,
    /// Failures exceeded threshold, calls are blocked.
    Open,
    /// Recovery mode, a bounded number of probes are allowed through.
    HalfOpen,
}

impl CircuitBreakerState {
    #[must_use]
    pub const fn as_metric_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }

    #[must_use]
    pub const fn as_gauge_value(&self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::HalfOpen => 0.5,
            Self::Open => 1.0,
        }
    }
}

/// Point-in-time view of a breaker, suitable for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitBreakerState,
    pub failure_count: u32,
    pub success_count: u32,
    pub half_open_calls: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub config: CircuitBreakerConfig,
}

/// Failure-isolation guard for one unreliable dependency.
///
/// Callers gate each invocation on [`can_execute`](Self::can_execute) (or
/// [`try_acquire`](Self::try_acquire), which also claims a half-open probe slot) and report the
/// outcome with [`record_success`](Self::record_success) /
/// [`record_failure`](Self::record_failure).
pub struct CircuitBreaker {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    inner: Arc<RwLock<BreakerInternalState>>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Arc::new(RwLock::new(BreakerInternalState::new())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Determines whether a call should be allowed through.
    ///
    /// Moves an `Open` breaker to `HalfOpen` once the reset timeout has elapsed. In `HalfOpen`,
    /// returns `true` only while probe slots remain. Does not consume a slot; use
    /// [`try_acquire`](Self::try_acquire) when the call is about to be made.
    ///
    /// Uses double-checked locking: the common `Closed` path only takes the read lock.
    pub async fn can_execute(&self) -> bool {
        {
            let inner = self.inner.read().await;
            match inner.state {
                CircuitBreakerState::Closed => return true,
                CircuitBreakerState::HalfOpen => {
                    return inner.half_open_calls < self.config.half_open_max_calls;
                }
                CircuitBreakerState::Open => {
                    if !inner.reset_timeout_elapsed(&self.config) {
                        return false;
                    }
                }
            }
        }

        let mut inner = self.inner.write().await;
        self.admit(&mut inner, false)
    }

    /// Same gate as [`can_execute`](Self::can_execute), but atomically claims a probe slot
    /// when the breaker is `HalfOpen`. The slot stays claimed until an outcome is recorded.
    pub async fn try_acquire(&self) -> bool {
        let mut inner = self.inner.write().await;
        self.admit(&mut inner, true)
    }

    /// Like [`try_acquire`](Self::try_acquire), but returns a [`CallPermit`] that hands a
    /// claimed probe slot back if it is dropped before [`CallPermit::complete`].
    pub async fn acquire(&self) -> Option<CallPermit> {
        let mut inner = self.inner.write().await;
        if !self.admit(&mut inner, true) {
            return None;
        }
        let half_open_epoch =
            (inner.state == CircuitBreakerState::HalfOpen).then_some(inner.half_open_epoch);
        Some(CallPermit {
            name: Arc::clone(&self.name),
            inner: Arc::clone(&self.inner),
            half_open_epoch,
        })
    }

    fn admit(&self, inner: &mut BreakerInternalState, claim_probe: bool) -> bool {
        if inner.state == CircuitBreakerState::Open {
            if !inner.reset_timeout_elapsed(&self.config) {
                return false;
            }
            inner.state = CircuitBreakerState::HalfOpen;
            inner.half_open_calls = 0;
            inner.success_count = 0;
            inner.half_open_epoch += 1;
            warn!(breaker = %self.name, "circuit breaker transitioning to half-open state");
            crate::metrics::record_breaker_transition(&self.name, inner.state);
        }

        match inner.state {
            CircuitBreakerState::Closed => true,
            CircuitBreakerState::HalfOpen => {
                if inner.half_open_calls >= self.config.half_open_max_calls {
                    debug!(
                        breaker = %self.name,
                        half_open_calls = inner.half_open_calls,
                        "half-open probe budget exhausted"
                    );
                    return false;
                }
                if claim_probe {
                    inner.half_open_calls += 1;
                }
                true
            }
            CircuitBreakerState::Open => false,
        }
    }

    /// Records a successful call.
    ///
    /// Resets the failure count while `Closed`. While `HalfOpen`, counts toward
    /// `success_threshold` and closes the breaker once it is reached. Late successes from
    /// calls admitted before the breaker opened are ignored.
    pub async fn record_success(&self) {
        let mut inner = self.inner.write().await;
        match inner.state {
            CircuitBreakerState::Closed => {
                inner.failure_count = 0;
            }
            CircuitBreakerState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitBreakerState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.half_open_calls = 0;
                    info!(breaker = %self.name, "circuit breaker closed after successful probes");
                    crate::metrics::record_breaker_transition(&self.name, inner.state);
                }
            }
            CircuitBreakerState::Open => {}
        }
    }

    /// Records a failed call.
    ///
    /// Opens the breaker when the failure threshold is reached while `Closed`, and immediately
    /// when a `HalfOpen` probe fails.
    pub async fn record_failure(&self) {
        let mut inner = self.inner.write().await;
        inner.failure_count += 1;
        inner.mark_failure();

        match inner.state {
            CircuitBreakerState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitBreakerState::Open;
                    warn!(
                        breaker = %self.name,
                        threshold = self.config.failure_threshold,
                        "circuit breaker opened after reaching failure threshold"
                    );
                    crate::metrics::record_breaker_transition(&self.name, inner.state);
                }
            }
            CircuitBreakerState::HalfOpen => {
                inner.state = CircuitBreakerState::Open;
                inner.half_open_calls = 0;
                inner.success_count = 0;
                warn!(breaker = %self.name, "half-open probe failed, circuit breaker reopened");
                crate::metrics::record_breaker_transition(&self.name, inner.state);
            }
            CircuitBreakerState::Open => {}
        }
    }

    /// Forces the breaker back to `Closed` with all counters cleared.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        let epoch = inner.half_open_epoch;
        *inner = BreakerInternalState::new();
        inner.half_open_epoch = epoch;
        info!(breaker = %self.name, "circuit breaker manually reset");
        crate::metrics::record_breaker_transition(&self.name, inner.state);
    }

    pub async fn state(&self) -> CircuitBreakerState {
        self.inner.read().await.state
    }

    pub async fn failure_count(&self) -> u32 {
        self.inner.read().await.failure_count
    }

    pub async fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.read().await;
        BreakerSnapshot {
            name: self.name.to_string(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            half_open_calls: inner.half_open_calls,
            last_failure_at: inner.last_failure_at,
            config: self.config.clone(),
        }
    }
}

/// Admission for one call through a [`CircuitBreaker`].
///
/// Report the outcome on the breaker, then call [`complete`](Self::complete). A permit holding
/// a half-open slot that is dropped first, for example because the caller's future was
/// cancelled, releases the slot so the breaker cannot stay pinned in `HalfOpen`.
#[must_use = "dropping a permit releases its half-open slot"]
pub struct CallPermit {
    name: Arc<str>,
    inner: Arc<RwLock<BreakerInternalState>>,
    half_open_epoch: Option<u64>,
}

impl CallPermit {
    /// Whether this call occupies a half-open slot.
    #[must_use]
    pub fn holds_slot(&self) -> bool {
        self.half_open_epoch.is_some()
    }

    /// Marks the call's outcome as recorded.
    pub fn complete(mut self) {
        self.half_open_epoch = None;
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        let Some(epoch) = self.half_open_epoch.take() else {
            return;
        };

        if let Ok(mut inner) = self.inner.try_write() {
            if inner.release_slot(epoch) {
                debug!(breaker = %self.name, "released half-open slot of abandoned call");
            }
            return;
        }

        // Lock is busy; finish the release on the runtime instead of blocking in drop.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(breaker = %self.name, "no runtime to release half-open slot");
            return;
        };
        let name = Arc::clone(&self.name);
        let inner = Arc::clone(&self.inner);
        handle.spawn(async move {
            if inner.write().await.release_slot(epoch) {
                debug!(breaker = %name, "released half-open slot of abandoned call");
            }
        });
    }
}
