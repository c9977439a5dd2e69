//! Oscillation and stagnation detection over the per-round delta history.

use serde::Serialize;
use std::collections::VecDeque;

/// Deltas inspected for periodic patterns.
pub const PERIOD_WINDOW: usize = 6;

/// Deltas inspected for stagnation.
pub const STAGNATION_WINDOW: usize = 4;

const HISTORY_CAPACITY: usize = 16;

/// Shape of a non-converging delta sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OscillationPattern {
    /// Deltas alternate between two values.
    PeriodTwo,
    /// Deltas cycle through three values.
    PeriodThree,
    /// Deltas stopped changing without dropping below the convergence threshold.
    Stagnation,
}

/// Bounded history of per-round maximum deltas.
#[derive(Debug, Clone, Default)]
pub struct DeltaHistory {
    deltas: VecDeque<f64>,
}

impl DeltaHistory {
    #[must_use]
    pub fn new() -> Self {
        Self { deltas: VecDeque::with_capacity(HISTORY_CAPACITY) }
    }

    pub fn push(&mut self, delta: f64) {
        if self.deltas.len() == HISTORY_CAPACITY {
            self.deltas.pop_front();
        }
        self.deltas.push_back(delta);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Oldest-first copy of the most recent `n` deltas (fewer if not enough recorded).
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<f64> {
        let skip = self.deltas.len().saturating_sub(n);
        self.deltas.iter().skip(skip).copied().collect()
    }

    #[must_use]
    pub fn detect(&self, tolerance: f64, stagnation_variance: f64) -> Option<OscillationPattern> {
        detect_oscillation(&self.recent(PERIOD_WINDOW), tolerance, stagnation_variance)
    }
}

/// Classifies the tail of a delta history, oldest first.
///
/// Period checks need six deltas and stagnation needs four. A constant sequence is reported as
/// stagnation rather than as a period.
#[must_use]
pub fn detect_oscillation(
    history: &[f64],
    tolerance: f64,
    stagnation_variance: f64,
) -> Option<OscillationPattern> {
    let close = |a: f64, b: f64| (a - b).abs() <= tolerance;

    if history.len() >= PERIOD_WINDOW {
        let h = &history[history.len() - PERIOD_WINDOW..];

        if close(h[0], h[2]) && close(h[2], h[4]) && close(h[1], h[3]) && close(h[3], h[5]) &&
            !close(h[0], h[1])
        {
            return Some(OscillationPattern::PeriodTwo);
        }

        let all_equal = close(h[0], h[1]) && close(h[1], h[2]);
        if close(h[0], h[3]) && close(h[1], h[4]) && close(h[2], h[5]) && !all_equal {
            return Some(OscillationPattern::PeriodThree);
        }
    }

    if history.len() >= STAGNATION_WINDOW {
        let tail = &history[history.len() - STAGNATION_WINDOW..];
        if variance(tail) < stagnation_variance {
            return Some(OscillationPattern::Stagnation);
        }
    }

    None
}

#[allow(clippy::cast_precision_loss)]
fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
