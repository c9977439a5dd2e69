//! Execution providers and the values exchanged with them.

use crate::errors::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Work item handed to every provider of a redundant run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    #[serde(default)]
    pub kind: String,
}

impl Task {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into(), kind: String::new() }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

/// Per-call sampling parameters, varied across versions to decorrelate failures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    pub temperature: f64,
    pub seed: Option<u64>,
}

impl ExecutionParams {
    /// Parameters for the `index`-th version: temperature `min(1.0, 0.3 + 0.2 * index)`,
    /// seed `42 + index`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn for_version(index: usize) -> Self {
        Self {
            temperature: (0.3 + 0.2 * index as f64).min(1.0),
            seed: Some(42 + index as u64),
        }
    }
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self { temperature: 0.3, seed: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub content: String,
    pub confidence: f64,
}

impl ProviderResponse {
    #[must_use]
    pub fn new(content: impl Into<String>, confidence: f64) -> Self {
        Self { content: content.into(), confidence }
    }

    /// Passes the response through when its confidence is a number in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidResponse`] for NaN, infinite or out-of-range confidence.
    pub fn validate(self) -> Result<Self, ProviderError> {
        if is_valid_confidence(self.confidence) {
            Ok(self)
        } else {
            Err(ProviderError::InvalidResponse(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )))
        }
    }
}

pub(crate) fn is_valid_confidence(confidence: f64) -> bool {
    (0.0..=1.0).contains(&confidence)
}

/// Something that can execute a [`Task`] and report content with a confidence.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identity used for latency tracking and breaker keys.
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns [`ProviderError`] when the provider cannot produce a response.
    async fn execute(
        &self,
        task: &Task,
        params: &ExecutionParams,
    ) -> Result<ProviderResponse, ProviderError>;
}
