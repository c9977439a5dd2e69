//! Sliding-window latency tracker for hedge delay adaptation.

use std::{
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
    time::Duration,
};

/// Fixed-size ring of recent latencies for one provider.
///
/// Recording is lock-free through atomics so concurrent hedged calls can report through
/// `&self`. Samples are stored in microseconds; a zero latency is a valid sample, so the
/// filled length is derived from the write counter rather than from empty slots.
pub struct LatencyTracker {
    samples: Box<[AtomicU64]>,
    writes: AtomicUsize,
}

impl LatencyTracker {
    /// Creates a tracker keeping the last `window` samples (at least one).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let samples = (0..window.max(1)).map(|_| AtomicU64::new(0)).collect::<Vec<_>>();
        Self { samples: samples.into_boxed_slice(), writes: AtomicUsize::new(0) }
    }

    pub fn record(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        let index = self.writes.fetch_add(1, Ordering::Relaxed) % self.samples.len();
        self.samples[index].store(micros, Ordering::Relaxed);
    }

    /// Number of samples currently in the window.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed).min(self.samples.len())
    }

    fn sorted_micros(&self) -> Vec<u64> {
        let mut sorted: Vec<u64> = self
            .samples
            .iter()
            .take(self.sample_count())
            .map(|sample| sample.load(Ordering::Relaxed))
            .collect();
        sorted.sort_unstable();
        sorted
    }

    /// Returns `None` with no samples or a quantile outside `[0, 1]`.
    #[must_use]
    pub fn percentile(&self, quantile: f64) -> Option<Duration> {
        if !(0.0..=1.0).contains(&quantile) {
            return None;
        }
        let sorted = self.sorted_micros();
        if sorted.is_empty() {
            return None;
        }

        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let index = ((sorted.len() as f64 - 1.0) * quantile) as usize;
        Some(Duration::from_micros(sorted[index]))
    }

    #[must_use]
    pub fn average(&self) -> Option<Duration> {
        let sorted = self.sorted_micros();
        if sorted.is_empty() {
            return None;
        }
        let total: u128 = sorted.iter().map(|&v| u128::from(v)).sum();
        let average = total / sorted.len() as u128;
        Some(Duration::from_micros(u64::try_from(average).unwrap_or(u64::MAX)))
    }

    pub fn clear(&self) {
        for sample in &*self.samples {
            sample.store(0, Ordering::Relaxed);
        }
        self.writes.store(0, Ordering::Relaxed);
    }
}
