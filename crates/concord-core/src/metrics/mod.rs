//! # Metrics
//!
//! Thin recording helpers over the `metrics` facade. Every helper is a no-op until the host
//! process installs a recorder (for example a Prometheus exporter), so library code can record
//! unconditionally.
//!
//! | Metric | Kind | Labels |
//! |--------|------|--------|
//! | `concord_circuit_breaker_state` | gauge | `breaker` |
//! | `concord_circuit_breaker_transitions_total` | counter | `breaker`, `to_state` |
//! | `concord_circuit_breaker_rejections_total` | counter | `breaker` |
//! | `concord_quorum_decisions_total` | counter | `verdict` |
//! | `concord_quorum_participation_ratio` | histogram | |
//! | `concord_belief_iterations` | histogram | |
//! | `concord_belief_propagations_total` | counter | `converged` |
//! | `concord_belief_system_confidence` | gauge | |
//! | `concord_belief_oscillations_total` | counter | |
//! | `concord_belief_echo_rejections_total` | counter | |
//! | `concord_hedge_wins_total` | counter | `provider` |
//! | `concord_hedge_latency_seconds` | histogram | `provider` |
//! | `concord_redundancy_runs_total` | counter | `strategy`, `outcome` |
//! | `concord_redundancy_versions` | histogram | `strategy` |

use crate::{circuit_breaker::CircuitBreakerState, types::Verdict};
use metrics::{counter, gauge, histogram};
use std::time::Duration;

pub fn record_breaker_transition(breaker: &str, state: CircuitBreakerState) {
    gauge!("concord_circuit_breaker_state", "breaker" => breaker.to_string())
        .set(state.as_gauge_value());
    counter!(
        "concord_circuit_breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "to_state" => state.as_metric_str()
    )
    .increment(1);
}

pub fn record_breaker_rejection(breaker: &str) {
    counter!("concord_circuit_breaker_rejections_total", "breaker" => breaker.to_string())
        .increment(1);
}

#[allow(clippy::cast_precision_loss)]
pub fn record_quorum_decision(verdict: Verdict, usable: usize, total: usize) {
    counter!("concord_quorum_decisions_total", "verdict" => verdict.as_str()).increment(1);
    if total > 0 {
        histogram!("concord_quorum_participation_ratio").record(usable as f64 / total as f64);
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn record_propagation(iterations: usize, converged: bool, system_confidence: f64) {
    histogram!("concord_belief_iterations").record(iterations as f64);
    counter!(
        "concord_belief_propagations_total",
        "converged" => if converged { "true" } else { "false" }
    )
    .increment(1);
    gauge!("concord_belief_system_confidence").set(system_confidence);
}

pub fn record_oscillation() {
    counter!("concord_belief_oscillations_total").increment(1);
}

pub fn record_echo_rejection() {
    counter!("concord_belief_echo_rejections_total").increment(1);
}

pub fn record_hedge_win(provider: &str, latency: Duration) {
    counter!("concord_hedge_wins_total", "provider" => provider.to_string()).increment(1);
    histogram!("concord_hedge_latency_seconds", "provider" => provider.to_string())
        .record(latency.as_secs_f64());
}

#[allow(clippy::cast_precision_loss)]
pub fn record_redundancy_run(strategy: &'static str, succeeded: bool, versions: usize) {
    counter!(
        "concord_redundancy_runs_total",
        "strategy" => strategy,
        "outcome" => if succeeded { "success" } else { "failure" }
    )
    .increment(1);
    histogram!("concord_redundancy_versions", "strategy" => strategy).record(versions as f64);
}
