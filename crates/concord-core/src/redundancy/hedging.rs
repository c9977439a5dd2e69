//! Hedged calls for tail latency reduction.
//!
//! Launches the same task on several providers with staggered start delays and keeps the
//! first successful response. Losing calls are aborted and awaited before returning, so no
//! provider keeps working on a request nobody is waiting for.

use super::{
    config::RedundancyConfig,
    latency_tracker::LatencyTracker,
    provider::{ExecutionParams, Provider, ProviderResponse, Task},
};
use crate::errors::RedundancyError;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::Serialize;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Winning response of a hedged call.
#[derive(Debug, Clone, Serialize)]
pub struct HedgedResponse {
    pub provider: String,
    pub response: ProviderResponse,
    /// Position of the winner in the launch order.
    pub hedge_index: usize,
    /// Time from the start of the hedged call until the winner answered.
    #[serde(with = "duration_millis")]
    pub latency: Duration,
}

/// Latency percentiles for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencyStats {
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub average: Duration,
    pub samples: usize,
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Executes hedged calls and adapts the hedge delays from observed winner latencies.
///
/// # Lock-Free Delay Access
///
/// The delay schedule lives in an `ArcSwap`: every call loads it without locking, and
/// [`adapt_delays`](Self::adapt_delays) swaps in a new schedule atomically.
pub struct HedgeExecutor {
    delays: ArcSwap<Vec<Duration>>,
    latency_trackers: DashMap<String, LatencyTracker>,
    latency_window: usize,
    adapt_min_samples: usize,
}

impl HedgeExecutor {
    #[must_use]
    pub fn new(config: &RedundancyConfig) -> Self {
        Self {
            delays: ArcSwap::from_pointee(config.hedge_delays()),
            latency_trackers: DashMap::new(),
            latency_window: config.latency_window,
            adapt_min_samples: config.adapt_min_samples,
        }
    }

    /// Current delay schedule.
    #[must_use]
    pub fn delays(&self) -> Vec<Duration> {
        (**self.delays.load()).clone()
    }

    pub fn set_delays(&self, delays: Vec<Duration>) {
        self.delays.store(Arc::new(delays));
        info!("hedge delays updated");
    }

    pub fn record_latency(&self, provider: &str, latency: Duration) {
        if let Some(tracker) = self.latency_trackers.get(provider) {
            tracker.record(latency);
        } else {
            self.latency_trackers
                .entry(provider.to_string())
                .or_insert_with(|| LatencyTracker::new(self.latency_window))
                .record(latency);
        }
    }

    /// Races `providers` against each other, the `i`-th starting after the `i`-th delay.
    ///
    /// At most as many providers as there are configured delays are launched. Failed calls
    /// are logged and the race continues with the rest.
    ///
    /// # Errors
    ///
    /// Returns [`RedundancyError::NoProviders`] for an empty provider list and
    /// [`RedundancyError::AllProvidersFailed`] when every launched call failed.
    pub async fn hedged_call(
        &self,
        providers: &[Arc<dyn Provider>],
        task: &Task,
    ) -> Result<HedgedResponse, RedundancyError> {
        if providers.is_empty() {
            return Err(RedundancyError::NoProviders);
        }

        let delays = self.delays.load_full();
        let task = Arc::new(task.clone());
        let start = Instant::now();
        let mut calls = JoinSet::new();

        for (index, (provider, delay)) in providers.iter().zip(delays.iter()).enumerate() {
            let provider = Arc::clone(provider);
            let task = Arc::clone(&task);
            let delay = *delay;

            calls.spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let outcome = provider
                    .execute(&task, &ExecutionParams::default())
                    .await
                    .and_then(ProviderResponse::validate);
                (index, provider.name().to_string(), outcome)
            });
        }

        let attempted = calls.len();
        debug!(attempted, delays = ?delays, "launched hedged calls");

        while let Some(joined) = calls.join_next().await {
            match joined {
                Ok((hedge_index, provider, Ok(response))) => {
                    calls.abort_all();
                    while calls.join_next().await.is_some() {}

                    let latency = start.elapsed();
                    self.record_latency(&provider, latency);
                    crate::metrics::record_hedge_win(&provider, latency);
                    info!(
                        provider = %provider,
                        hedge_index,
                        latency_ms = latency.as_millis(),
                        "hedged call won"
                    );

                    return Ok(HedgedResponse { provider, response, hedge_index, latency });
                }
                Ok((hedge_index, provider, Err(error))) => {
                    warn!(provider = %provider, hedge_index, error = %error, "hedged call failed");
                }
                Err(error) => {
                    warn!(error = %error, "hedged call task did not complete");
                }
            }
        }

        warn!(attempted, "all hedged calls failed");
        Err(RedundancyError::AllProvidersFailed { attempted })
    }

    /// Retunes delays to `[0, avg p50, avg p95]` over providers with enough samples.
    ///
    /// Returns the new schedule, or `None` when no provider has enough samples yet.
    pub fn adapt_delays(&self) -> Option<Vec<Duration>> {
        let mut p50s = Vec::new();
        let mut p95s = Vec::new();

        for entry in &self.latency_trackers {
            if entry.sample_count() < self.adapt_min_samples {
                continue;
            }
            if let (Some(p50), Some(p95)) = (entry.percentile(0.50), entry.percentile(0.95)) {
                p50s.push(p50);
                p95s.push(p95);
            }
        }

        if p50s.is_empty() {
            debug!("not enough latency samples to adapt hedge delays");
            return None;
        }

        let delays = vec![Duration::ZERO, mean(&p50s), mean(&p95s)];
        info!(
            providers = p50s.len(),
            p50_ms = delays[1].as_millis(),
            p95_ms = delays[2].as_millis(),
            "adapted hedge delays"
        );
        self.delays.store(Arc::new(delays.clone()));
        Some(delays)
    }

    #[must_use]
    pub fn get_latency_stats(&self, provider: &str) -> Option<LatencyStats> {
        let tracker = self.latency_trackers.get(provider)?;

        Some(LatencyStats {
            p50: tracker.percentile(0.50)?,
            p95: tracker.percentile(0.95)?,
            p99: tracker.percentile(0.99)?,
            average: tracker.average()?,
            samples: tracker.sample_count(),
        })
    }

    pub fn clear_latency_data(&self) {
        self.latency_trackers.clear();
        info!("cleared hedge latency data");
    }
}

fn mean(values: &[Duration]) -> Duration {
    let total: Duration = values.iter().sum();
    u32::try_from(values.len()).map_or(Duration::ZERO, |count| total / count.max(1))
}
