//! Scripted providers that record started, completed and cancelled calls.

use async_trait::async_trait;
use concord_core::{
    errors::ProviderError,
    redundancy::{ExecutionParams, Provider, ProviderResponse, Task},
};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

/// Shared record of what happened to a provider's calls.
#[derive(Debug, Default)]
pub struct CallRecord {
    started: AtomicUsize,
    completed: AtomicUsize,
    cancelled: AtomicBool,
}

impl CallRecord {
    #[must_use]
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// True once a call was dropped before it finished.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Marks the record cancelled if dropped before `finish`.
struct InFlight {
    record: Arc<CallRecord>,
    finished: bool,
}

impl InFlight {
    fn start(record: &Arc<CallRecord>) -> Self {
        record.started.fetch_add(1, Ordering::SeqCst);
        Self { record: Arc::clone(record), finished: false }
    }

    fn finish(mut self) {
        self.finished = true;
        self.record.completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            self.record.cancelled.store(true, Ordering::SeqCst);
        }
    }
}

/// Provider answering with fixed content after an optional latency.
pub struct MockProvider {
    name: String,
    content: String,
    confidence: f64,
    latency: Duration,
    failing: bool,
    record: Arc<CallRecord>,
}

impl MockProvider {
    #[must_use]
    pub fn new(name: &str, content: &str, confidence: f64) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_string(),
            confidence,
            latency: Duration::ZERO,
            failing: false,
            record: Arc::new(CallRecord::default()),
        }
    }

    /// Provider whose calls always fail after its latency.
    #[must_use]
    pub fn failing(name: &str) -> Self {
        Self { failing: true, ..Self::new(name, "", 0.0) }
    }

    #[must_use]
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency = Duration::from_millis(latency_ms);
        self
    }

    #[must_use]
    pub fn calls(&self) -> Arc<CallRecord> {
        Arc::clone(&self.record)
    }

    /// Wraps the provider for APIs taking `Arc<dyn Provider>`.
    #[must_use]
    pub fn shared(self) -> Arc<dyn Provider> {
        Arc::new(self)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        _task: &Task,
        _params: &ExecutionParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let call = InFlight::start(&self.record);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        call.finish();

        if self.failing {
            return Err(ProviderError::Failed(format!("{} unavailable", self.name)));
        }
        Ok(ProviderResponse::new(self.content.clone(), self.confidence))
    }
}
