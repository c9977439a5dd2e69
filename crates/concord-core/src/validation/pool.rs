//! Pool orchestration: fan-out to validators, breaker protection and result aggregation.

use super::{
    config::ValidatorPoolConfig,
    quorum::{output_to_verdict, QuorumTally, ValidatorOutput},
};
use crate::{
    circuit_breaker::CircuitBreakerManager,
    errors::{BreakerError, ValidatorError},
    types::{
        CallOutcome, ClaimPayload, ValidationFailure, ValidationResult, Verdict, QUORUM_POOL_ID,
    },
};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use tracing::{debug, info, warn};

/// A source of opinions about claims.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Judges a claim.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`] when no judgement could be produced. The pool converts the
    /// error into an abstention and records it against the validator's circuit breaker.
    async fn validate(&self, claim: &ClaimPayload) -> Result<ValidatorOutput, ValidatorError>;
}

#[derive(Clone)]
struct RegisteredValidator {
    name: Arc<str>,
    validator: Arc<dyn Validator>,
}

/// Per-validator record of one pool run.
#[derive(Debug, Clone)]
pub struct ValidatorCall {
    pub validator: Arc<str>,
    pub outcome: CallOutcome<ValidationResult>,
}

/// Pooled verdict plus the detail it was derived from.
#[derive(Debug, Clone)]
pub struct QuorumReport {
    pub result: ValidationResult,
    pub tally: QuorumTally,
    pub quorum: usize,
    pub calls: Vec<ValidatorCall>,
}

impl QuorumReport {
    /// Number of validators whose call produced a usable result.
    #[must_use]
    pub fn usable_count(&self) -> usize {
        self.calls.iter().filter(|call| call.outcome.is_usable()).count()
    }
}

/// Serializable registry summary.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub validators: Vec<String>,
    pub default_quorum: usize,
}

/// Runs registered validators concurrently and pools their verdicts under a quorum rule.
///
/// Each validator is guarded by its own circuit breaker (`validator_<name>`) in the shared
/// [`CircuitBreakerManager`], so one failing validator is isolated without affecting the rest.
pub struct ValidatorPool {
    validators: ArcSwap<Vec<RegisteredValidator>>,
    breakers: Arc<CircuitBreakerManager>,
    config: ValidatorPoolConfig,
}

impl ValidatorPool {
    #[must_use]
    pub fn new(config: ValidatorPoolConfig, breakers: Arc<CircuitBreakerManager>) -> Self {
        Self { validators: ArcSwap::from_pointee(Vec::new()), breakers, config }
    }

    #[must_use]
    pub fn config(&self) -> &ValidatorPoolConfig {
        &self.config
    }

    /// Registers a validator under `name`, replacing any validator already registered with
    /// that name.
    pub fn register(&self, name: impl Into<Arc<str>>, validator: Arc<dyn Validator>) {
        let name = name.into();
        self.validators.rcu(|current| {
            let mut next: Vec<RegisteredValidator> = current
                .iter()
                .filter(|entry| entry.name != name)
                .cloned()
                .collect();
            next.push(RegisteredValidator {
                name: Arc::clone(&name),
                validator: Arc::clone(&validator),
            });
            next
        });
        info!(validator = %name, "registered validator");
    }

    /// Removes a validator. Returns `false` if it was not registered.
    pub fn unregister(&self, name: &str) -> bool {
        let before = self.validators.load().len();
        self.validators.rcu(|current| {
            current.iter().filter(|entry| &*entry.name != name).cloned().collect::<Vec<_>>()
        });
        let removed = self.validators.load().len() < before;
        if removed {
            info!(validator = %name, "unregistered validator");
        }
        removed
    }

    #[must_use]
    pub fn validator_count(&self) -> usize {
        self.validators.load().len()
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            validators: self.validators.load().iter().map(|v| v.name.to_string()).collect(),
            default_quorum: self.config.default_quorum,
        }
    }

    /// Validates with the configured default quorum.
    pub async fn validate(&self, claim: &ClaimPayload) -> ValidationResult {
        self.validate_with_quorum(claim, self.config.default_quorum).await
    }

    /// Runs every validator and returns the pooled verdict.
    ///
    /// Never fails: missing validators, insufficient quorum and per-validator failures are
    /// reported as zero-confidence abstentions carrying a [`ValidationFailure`].
    pub async fn validate_with_quorum(
        &self,
        claim: &ClaimPayload,
        quorum: usize,
    ) -> ValidationResult {
        self.validate_with_report(claim, quorum).await.result
    }

    /// Same as [`validate_with_quorum`](Self::validate_with_quorum), keeping the tally and
    /// per-validator outcomes.
    pub async fn validate_with_report(
        &self,
        claim: &ClaimPayload,
        quorum: usize,
    ) -> QuorumReport {
        let started = Instant::now();
        let quorum = quorum.max(1);
        let validators = self.validators.load_full();

        if validators.is_empty() {
            warn!(claim_id = %claim.claim_id, "no validators configured");
            return QuorumReport {
                result: ValidationResult::failed(QUORUM_POOL_ID, ValidationFailure::NoValidators),
                tally: QuorumTally::from_results(&[]),
                quorum,
                calls: Vec::new(),
            };
        }

        let calls: Vec<ValidatorCall> =
            join_all(validators.iter().map(|entry| self.run_validator(entry, claim))).await;

        let mut usable = Vec::with_capacity(calls.len());
        let mut failure_errors = Vec::new();
        for call in &calls {
            match &call.outcome {
                CallOutcome::Ok(result) | CallOutcome::Abstained(result) => {
                    usable.push(result.clone());
                }
                CallOutcome::CircuitOpen => failure_errors.push(
                    ValidationFailure::CircuitOpen { validator: call.validator.to_string() }
                        .to_string(),
                ),
                CallOutcome::ExecutionFailed(message) => failure_errors.push(
                    ValidationFailure::ExecutionFailed {
                        validator: call.validator.to_string(),
                        message: message.clone(),
                    }
                    .to_string(),
                ),
            }
        }

        let tally = QuorumTally::from_results(&usable);

        if usable.len() < quorum {
            warn!(
                claim_id = %claim.claim_id,
                succeeded = usable.len(),
                required = quorum,
                total = calls.len(),
                "insufficient validator consensus"
            );
            crate::metrics::record_quorum_decision(Verdict::Abstain, usable.len(), calls.len());
            let result = ValidationResult::failed(
                QUORUM_POOL_ID,
                ValidationFailure::InsufficientValidators {
                    succeeded: usable.len(),
                    required: quorum,
                },
            )
            .with_evidence(vec!["insufficient validator consensus".to_string()])
            .with_errors(failure_errors)
            .with_execution_time(started.elapsed());
            return QuorumReport { result, tally, quorum, calls };
        }

        let verdict = tally.decide();
        let evidence: Vec<String> =
            usable.iter().flat_map(|result| result.evidence().iter().cloned()).collect();
        let mut errors: Vec<String> =
            usable.iter().flat_map(|result| result.errors().iter().cloned()).collect();
        errors.extend(failure_errors);

        info!(
            claim_id = %claim.claim_id,
            verdict = %verdict,
            support = tally.support,
            reject = tally.reject,
            abstain = tally.abstain,
            avg_confidence = tally.avg_confidence,
            total_llr = tally.total_llr,
            "quorum verdict reached"
        );
        crate::metrics::record_quorum_decision(verdict, usable.len(), calls.len());

        let result =
            ValidationResult::from_aggregate(verdict, tally.avg_confidence, QUORUM_POOL_ID)
                .with_evidence(evidence)
                .with_errors(errors)
                .with_execution_time(started.elapsed());

        QuorumReport { result, tally, quorum, calls }
    }

    async fn run_validator(
        &self,
        entry: &RegisteredValidator,
        claim: &ClaimPayload,
    ) -> ValidatorCall {
        let started = Instant::now();
        let breaker_key = format!("validator_{}", entry.name);
        let timeout = self.config.validator_timeout();

        let outcome = self
            .breakers
            .execute_with_config(&breaker_key, &self.config.breaker, || async {
                let output = tokio::time::timeout(timeout, entry.validator.validate(claim))
                    .await
                    .map_err(|_| ValidatorError::Timeout(self.config.validator_timeout_ms))??;
                if !output.score.is_finite() || !(0.0..=1.0).contains(&output.score) {
                    return Err(ValidatorError::InvalidScore(output.score));
                }
                Ok::<_, ValidatorError>(output)
            })
            .await;

        let outcome = match outcome {
            Ok(output) => {
                let verdict = output_to_verdict(&output, &self.config);
                let result =
                    ValidationResult::from_aggregate(verdict, output.score, Arc::clone(&entry.name))
                        .with_evidence(output.evidence)
                        .with_errors(output.issues)
                        .with_execution_time(started.elapsed());
                debug!(
                    validator = %entry.name,
                    verdict = %verdict,
                    score = output.score,
                    "validator completed"
                );
                if verdict == Verdict::Abstain {
                    CallOutcome::Abstained(result)
                } else {
                    CallOutcome::Ok(result)
                }
            }
            Err(BreakerError::Open { .. }) => {
                debug!(validator = %entry.name, "validator skipped, circuit breaker open");
                CallOutcome::CircuitOpen
            }
            Err(BreakerError::ExecutionFailed { source, .. }) => {
                warn!(validator = %entry.name, error = %source, "validator failed");
                CallOutcome::ExecutionFailed(source.to_string())
            }
        };

        ValidatorCall { validator: Arc::clone(&entry.name), outcome }
    }
}
