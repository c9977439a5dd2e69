use thiserror::Error;

/// Errors raised when constructing value objects.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

/// Failures reported by a single validator.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ValidatorError {
    #[error("validator timed out after {0} ms")]
    Timeout(u64),

    #[error("validator returned an unusable score: {0}")]
    InvalidScore(f64),

    #[error("validator failed: {0}")]
    Failed(String),
}

/// Failures reported by a single execution provider.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("provider timed out after {0} ms")]
    Timeout(u64),

    #[error("provider returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("provider failed: {0}")]
    Failed(String),
}

/// Outcome of a call routed through a circuit breaker that did not succeed.
///
/// `Open` means the wrapped operation was never invoked; `ExecutionFailed` means it ran, failed,
/// and the failure has already been recorded against the breaker.
#[derive(Error, Debug)]
pub enum BreakerError<E> {
    #[error("circuit breaker {name} is open")]
    Open { name: String },

    #[error("circuit breaker {name} recorded failure: {source}")]
    ExecutionFailed {
        name: String,
        #[source]
        source: E,
    },
}

impl<E> BreakerError<E> {
    /// Name of the breaker that produced this error.
    #[must_use]
    pub fn breaker_name(&self) -> &str {
        match self {
            Self::Open { name } | Self::ExecutionFailed { name, .. } => name,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Errors surfaced by the redundancy layer once every fallback is exhausted.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum RedundancyError {
    #[error("no providers supplied")]
    NoProviders,

    #[error("all {attempted} hedged providers failed")]
    AllProvidersFailed { attempted: usize },

    #[error("no valid results from {attempted} providers")]
    NoValidResults { attempted: usize },
}
