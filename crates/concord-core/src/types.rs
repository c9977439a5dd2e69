//! Shared value objects passed between the belief engine, the validator pool and the
//! redundancy layer.

use crate::errors::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};

/// Identifier grouping every proposal and validation about one contested piece of content.
pub type ClaimId = Arc<str>;

/// Lower clamp applied to confidences before any logarithm.
pub const LLR_EPSILON: f64 = 1e-6;

/// Output identity of the validator pool's aggregated verdict.
pub const QUORUM_POOL_ID: &str = "quorum_pool";

/// Output identity of the redundancy layer's confirmation round.
pub const HEDGED_CONFIRMATION_ID: &str = "hedged_confirmation";

/// Signed opinion a validator holds about a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Support,
    Reject,
    Abstain,
}

impl Verdict {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Reject => "reject",
            Self::Abstain => "abstain",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts a verdict and its confidence into a signed log-likelihood ratio.
///
/// The confidence is clamped to `[1e-6, 1 - 1e-6]` so the log-odds stay finite. The magnitude is
/// the absolute log-odds; the sign comes from the verdict, so support is never negative and
/// reject is never positive. Abstentions carry no evidence and map to `0.0`.
#[must_use]
pub fn verdict_to_llr(verdict: Verdict, confidence: f64) -> f64 {
    let clamped = if confidence.is_nan() {
        0.5
    } else {
        confidence.clamp(LLR_EPSILON, 1.0 - LLR_EPSILON)
    };
    let magnitude = (clamped / (1.0 - clamped)).ln().abs();

    match verdict {
        Verdict::Support => magnitude,
        Verdict::Reject => -magnitude,
        Verdict::Abstain => 0.0,
    }
}

/// Why an otherwise well-formed validation result carries no real opinion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ValidationFailure {
    /// The validator's circuit breaker refused the call.
    CircuitOpen { validator: String },
    /// The validator was invoked and failed or timed out.
    ExecutionFailed { validator: String, message: String },
    /// The pool has nothing registered.
    NoValidators,
    /// Fewer validators produced a usable result than the quorum requires.
    InsufficientValidators { succeeded: usize, required: usize },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitOpen { validator } => {
                write!(f, "circuit breaker open for validator {validator}")
            }
            Self::ExecutionFailed { validator, message } => {
                write!(f, "validator {validator} failed: {message}")
            }
            Self::NoValidators => f.write_str("no validators configured"),
            Self::InsufficientValidators { succeeded, required } => {
                write!(f, "only {succeeded} validators succeeded, quorum requires {required}")
            }
        }
    }
}

/// A signed, confidence-scored opinion about one claim.
///
/// Built only through [`ValidationResult::new`], which rejects out-of-range confidences and
/// derives [`llr`](Self::llr) from the verdict, so the log-likelihood ratio can never disagree
/// with the rest of the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    verdict: Verdict,
    confidence: f64,
    llr: f64,
    evidence: Vec<String>,
    errors: Vec<String>,
    validator_id: Arc<str>,
    timestamp: DateTime<Utc>,
    #[serde(with = "duration_millis")]
    execution_time: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<ValidationFailure>,
}

impl ValidationResult {
    /// Creates a validation result stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ConfidenceOutOfRange`] if `confidence` is NaN, infinite or
    /// outside `[0, 1]`.
    pub fn new(
        verdict: Verdict,
        confidence: f64,
        validator_id: impl Into<Arc<str>>,
    ) -> Result<Self, ValidationError> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(confidence));
        }

        Ok(Self {
            verdict,
            confidence,
            llr: verdict_to_llr(verdict, confidence),
            evidence: Vec::new(),
            errors: Vec::new(),
            validator_id: validator_id.into(),
            timestamp: Utc::now(),
            execution_time: Duration::ZERO,
            failure: None,
        })
    }

    /// Builds a result from a confidence already known to come from in-range inputs, clamping
    /// rounding drift back into `[0, 1]`.
    pub(crate) fn from_aggregate(
        verdict: Verdict,
        confidence: f64,
        validator_id: impl Into<Arc<str>>,
    ) -> Self {
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        Self {
            verdict,
            confidence,
            llr: verdict_to_llr(verdict, confidence),
            evidence: Vec::new(),
            errors: Vec::new(),
            validator_id: validator_id.into(),
            timestamp: Utc::now(),
            execution_time: Duration::ZERO,
            failure: None,
        }
    }

    /// Zero-confidence abstention describing why no opinion was produced.
    #[must_use]
    pub fn failed(validator_id: impl Into<Arc<str>>, failure: ValidationFailure) -> Self {
        let message = failure.to_string();
        Self {
            verdict: Verdict::Abstain,
            confidence: 0.0,
            llr: 0.0,
            evidence: Vec::new(),
            errors: vec![message],
            validator_id: validator_id.into(),
            timestamp: Utc::now(),
            execution_time: Duration::ZERO,
            failure: Some(failure),
        }
    }

    #[must_use]
    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors.extend(errors);
        self
    }

    #[must_use]
    pub fn with_execution_time(mut self, execution_time: Duration) -> Self {
        self.execution_time = execution_time;
        self
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Signed log-likelihood ratio derived at construction.
    #[must_use]
    pub fn llr(&self) -> f64 {
        self.llr
    }

    #[must_use]
    pub fn evidence(&self) -> &[String] {
        &self.evidence
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    #[must_use]
    pub fn validator_id(&self) -> &str {
        &self.validator_id
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }

    #[must_use]
    pub fn failure(&self) -> Option<&ValidationFailure> {
        self.failure.as_ref()
    }

    /// Legacy boolean view: anything that is not an explicit rejection.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.verdict != Verdict::Reject
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Role a source plays in the decision pipeline.
///
/// Only proposers may feed candidate content into the belief engine. Validators and aggregators
/// produce opinions about content and must never re-enter as fresh evidence for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRole {
    Proposer,
    Validator,
    Aggregator,
}

/// Identity attached to every proposal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalSource {
    pub id: Arc<str>,
    pub role: SourceRole,
}

impl ProposalSource {
    #[must_use]
    pub fn proposer(id: impl Into<Arc<str>>) -> Self {
        Self { id: id.into(), role: SourceRole::Proposer }
    }

    #[must_use]
    pub fn validator(id: impl Into<Arc<str>>) -> Self {
        Self { id: id.into(), role: SourceRole::Validator }
    }

    #[must_use]
    pub fn aggregator(id: impl Into<Arc<str>>) -> Self {
        Self { id: id.into(), role: SourceRole::Aggregator }
    }
}

impl From<&str> for ProposalSource {
    fn from(id: &str) -> Self {
        Self::proposer(id)
    }
}

impl fmt::Display for ProposalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// What validators are asked to judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimPayload {
    pub claim_id: ClaimId,
    pub content: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub source: Option<Arc<str>>,
}

impl ClaimPayload {
    #[must_use]
    pub fn new(claim_id: impl Into<ClaimId>, content: impl Into<String>) -> Self {
        Self {
            claim_id: claim_id.into(),
            content: content.into(),
            confidence: None,
            evidence: Vec::new(),
            source: None,
        }
    }
}

/// Tagged outcome of one protected call.
///
/// Lets fan-out code decide what to do with each participant by matching on data instead of
/// intercepting errors at every call site.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    /// The call completed and produced a usable value.
    Ok(T),
    /// The call completed but declined to give an opinion.
    Abstained(T),
    /// The circuit breaker refused the call; nothing was invoked.
    CircuitOpen,
    /// The call was invoked and failed.
    ExecutionFailed(String),
}

impl<T> CallOutcome<T> {
    /// Whether the call produced a result that may count toward a quorum.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Ok(_) | Self::Abstained(_))
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(value) | Self::Abstained(value) => Some(value),
            Self::CircuitOpen | Self::ExecutionFailed(_) => None,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Ok(value) | Self::Abstained(value) => Some(value),
            Self::CircuitOpen | Self::ExecutionFailed(_) => None,
        }
    }
}
