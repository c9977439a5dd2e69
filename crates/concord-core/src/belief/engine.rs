//! Belief propagation engine: proposal intake, validation intake and the damped update loop.

use super::{
    config::BeliefConfig,
    node::{BeliefNode, Candidate},
    oscillation::{DeltaHistory, OscillationPattern},
};
use crate::types::{ClaimId, ProposalSource, SourceRole, ValidationResult, Verdict};
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Number of alternatives reported per claim.
const TOP_ALTERNATIVES: usize = 3;

/// What happened to a submitted proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalOutcome {
    Accepted,
    /// The source is an aggregator, a validator or another reserved identity.
    RejectedEcho,
    /// The confidence was NaN, infinite or outside `[0, 1]`.
    RejectedInvalid,
}

/// Consensus reached for one claim.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimConsensus {
    pub content: String,
    pub confidence: f64,
    pub converged: bool,
    pub alternatives: Vec<Candidate>,
}

/// Output of one [`BeliefPropagationEngine::propagate`] run.
#[derive(Debug, Clone, Serialize)]
pub struct PropagationResult {
    pub consensus: BTreeMap<ClaimId, ClaimConsensus>,
    pub system_confidence: f64,
    pub iterations: usize,
    pub converged: bool,
    pub oscillation_detected: bool,
    pub oscillation_pattern: Option<OscillationPattern>,
    pub final_damping: f64,
    pub final_delta: f64,
}

type MessageKey = (Arc<str>, u64);

#[derive(Debug, Default)]
struct EngineState {
    beliefs: BTreeMap<ClaimId, BeliefNode>,
    /// Live validations per claim, at most one per `(validator, round)`.
    messages: BTreeMap<ClaimId, BTreeMap<MessageKey, ValidationResult>>,
    reserved: HashSet<Arc<str>>,
}

/// Aggregated validation signal for one claim.
#[derive(Debug, Clone, Copy)]
struct ValidationSignal {
    avg_confidence: f64,
    success_rate: f64,
}

/// Merges proposals and validations into per-claim beliefs and iterates them to a damped,
/// oscillation-resistant consensus.
///
/// # Concurrency
///
/// All state lives behind one `RwLock`. Intake operations take the write lock briefly;
/// `propagate` holds it for the whole (bounded) run so concurrent intake never observes a
/// half-finished round.
pub struct BeliefPropagationEngine {
    config: BeliefConfig,
    state: RwLock<EngineState>,
}

impl Default for BeliefPropagationEngine {
    fn default() -> Self {
        Self::new(BeliefConfig::default())
    }
}

impl BeliefPropagationEngine {
    #[must_use]
    pub fn new(config: BeliefConfig) -> Self {
        let reserved = config.reserved_sources.iter().map(|s| Arc::from(s.as_str())).collect();
        Self {
            config,
            state: RwLock::new(EngineState { reserved, ..EngineState::default() }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &BeliefConfig {
        &self.config
    }

    /// Folds a proposal into the claim's candidate map.
    ///
    /// Proposals whose source is not a plain proposer, or whose identity is reserved, are
    /// dropped with a warning so consensus output can never be fed back as fresh evidence.
    pub async fn add_proposal(
        &self,
        claim_id: impl Into<ClaimId>,
        content: &str,
        confidence: f64,
        source: impl Into<ProposalSource>,
    ) -> ProposalOutcome {
        let claim_id = claim_id.into();
        let source = source.into();
        let mut state = self.state.write().await;

        if source.role != SourceRole::Proposer || state.reserved.contains(&source.id) {
            warn!(
                claim_id = %claim_id,
                source = %source.id,
                role = ?source.role,
                "dropping proposal from reserved source"
            );
            crate::metrics::record_echo_rejection();
            return ProposalOutcome::RejectedEcho;
        }

        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            warn!(claim_id = %claim_id, confidence, "dropping proposal with invalid confidence");
            return ProposalOutcome::RejectedInvalid;
        }

        let node = state
            .beliefs
            .entry(Arc::clone(&claim_id))
            .or_insert_with(|| BeliefNode::new(Arc::clone(&claim_id)));
        node.fold_proposal(
            content,
            confidence,
            self.config.blend_old_weight,
            self.config.blend_new_weight,
        );

        debug!(
            claim_id = %claim_id,
            source = %source.id,
            confidence,
            evidence_count = node.evidence_count(),
            "proposal accepted"
        );
        ProposalOutcome::Accepted
    }

    /// Stores a validation under `(claim_id, validator_id, round)`, replacing any earlier
    /// validation with the same key. The validator identity is reserved against proposals.
    pub async fn add_validation(
        &self,
        claim_id: impl Into<ClaimId>,
        validator_id: &str,
        round: u64,
        result: ValidationResult,
    ) {
        let claim_id = claim_id.into();
        let validator: Arc<str> = Arc::from(validator_id);
        let mut state = self.state.write().await;

        state.reserved.insert(Arc::clone(&validator));
        let replaced = state
            .messages
            .entry(Arc::clone(&claim_id))
            .or_default()
            .insert((validator, round), result)
            .is_some();

        debug!(
            claim_id = %claim_id,
            validator = validator_id,
            round,
            replaced,
            "validation stored"
        );
    }

    /// Rescales claims whose maximum score exceeds 1.0 and refreshes confidences.
    pub async fn normalize(&self) {
        let mut state = self.state.write().await;
        for node in state.beliefs.values_mut() {
            node.normalize(self.config.min_confidence);
        }
    }

    /// Runs damped propagation until convergence, patience exhaustion or `max_iterations`.
    ///
    /// Never fails: with no evidence or no convergence the best-effort consensus is returned
    /// with `converged = false`.
    pub async fn propagate(&self) -> PropagationResult {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let config = &self.config;

        info!(
            claims = state.beliefs.len(),
            max_iterations = config.max_iterations,
            "starting belief propagation"
        );

        if state.beliefs.is_empty() {
            warn!("no beliefs to propagate");
            crate::metrics::record_propagation(0, false, 0.0);
            return PropagationResult {
                consensus: BTreeMap::new(),
                system_confidence: 0.0,
                iterations: 0,
                converged: false,
                oscillation_detected: false,
                oscillation_pattern: None,
                final_damping: config.damping_factor,
                final_delta: 0.0,
            };
        }

        for node in state.beliefs.values_mut() {
            node.normalize(config.min_confidence);
        }

        let signals: BTreeMap<ClaimId, ValidationSignal> = state
            .messages
            .iter()
            .filter_map(|(claim_id, messages)| {
                aggregate_validations(messages.values()).map(|s| (Arc::clone(claim_id), s))
            })
            .collect();

        let mut damping = config.damping_factor;
        let mut history = DeltaHistory::new();
        let mut converged = false;
        let mut oscillation_pattern = None;
        let mut previous_delta: Option<f64> = None;
        let mut patience = 0usize;
        let mut iterations = 0usize;
        let mut final_delta = 0.0_f64;

        while iterations < config.max_iterations {
            iterations += 1;
            let mut max_delta = 0.0_f64;

            for (claim_id, node) in &mut state.beliefs {
                let before = node.snapshot_scores();
                let factor = signals
                    .get(claim_id)
                    .map_or(1.0, |signal| self.update_factor(*signal, node.max_score()));

                node.scale(factor);
                node.damp_against(&before, damping);
                node.normalize(config.min_confidence);

                for (candidate, old) in node.candidates().iter().zip(&before) {
                    max_delta = max_delta.max((candidate.score - old).abs());
                }
            }

            history.push(max_delta);
            final_delta = max_delta;
            debug!(iteration = iterations, max_delta, damping, "propagation round complete");

            if max_delta < config.convergence_threshold {
                converged = true;
                break;
            }

            if let Some(pattern) =
                history.detect(config.oscillation_tolerance, config.stagnation_variance)
            {
                damping += (config.max_damping - damping) * config.damping_step;
                for node in state.beliefs.values_mut() {
                    node.stabilize(config.min_confidence);
                }
                if oscillation_pattern.is_none() {
                    warn!(iteration = iterations, ?pattern, damping, "oscillation detected");
                    crate::metrics::record_oscillation();
                }
                oscillation_pattern = Some(pattern);
            }

            if let Some(previous) = previous_delta {
                if max_delta > previous * (1.0 - config.min_improvement) {
                    patience += 1;
                } else {
                    patience = 0;
                }
            }
            previous_delta = Some(max_delta);

            if patience >= config.patience && iterations >= config.min_rounds {
                warn!(iteration = iterations, patience, "stopping propagation early, no progress");
                break;
            }
        }

        if !converged {
            warn!(
                iterations,
                final_delta,
                threshold = config.convergence_threshold,
                "belief propagation did not converge"
            );
        }

        let consensus = extract_consensus(&state.beliefs);
        let system_confidence = self.system_confidence(&consensus);

        info!(
            iterations,
            converged,
            system_confidence,
            final_damping = damping,
            "belief propagation finished"
        );
        crate::metrics::record_propagation(iterations, converged, system_confidence);

        PropagationResult {
            consensus,
            system_confidence,
            iterations,
            converged,
            oscillation_detected: oscillation_pattern.is_some(),
            oscillation_pattern,
            final_damping: damping,
            final_delta,
        }
    }

    /// Multiplicative factor applied to every candidate of a claim whose current maximum
    /// score is `max_score`.
    fn update_factor(&self, signal: ValidationSignal, max_score: f64) -> f64 {
        let config = &self.config;
        let headroom_up = (1.0 - max_score / config.score_ceiling).max(0.0);
        let headroom_down =
            if max_score > 0.0 { (1.0 - config.score_floor / max_score).max(0.0) } else { 0.0 };

        let ValidationSignal { avg_confidence, success_rate } = signal;

        if success_rate > config.positive_threshold && avg_confidence > config.positive_threshold
        {
            1.0 + config.boost_rate * avg_confidence * headroom_up
        } else if success_rate < config.negative_threshold ||
            avg_confidence < config.negative_threshold
        {
            let severity = (1.0 - success_rate).max(1.0 - avg_confidence);
            1.0 - config.penalty_rate * severity * headroom_down
        } else {
            let lean = success_rate - 0.5;
            let headroom = if lean >= 0.0 { headroom_up } else { headroom_down };
            1.0 + config.neutral_rate * lean * headroom
        }
    }

    /// Harmonic mean of claim confidences plus a bonus for the converged fraction.
    #[allow(clippy::cast_precision_loss)]
    fn system_confidence(&self, consensus: &BTreeMap<ClaimId, ClaimConsensus>) -> f64 {
        if consensus.is_empty() {
            return 0.0;
        }

        let count = consensus.len() as f64;
        let harmonic = if consensus.values().any(|c| c.confidence <= 0.0) {
            0.0
        } else {
            count / consensus.values().map(|c| 1.0 / c.confidence).sum::<f64>()
        };
        let converged_fraction =
            consensus.values().filter(|c| c.converged).count() as f64 / count;

        (harmonic + self.config.convergence_bonus * converged_fraction).min(1.0)
    }

    /// Snapshot of one claim's belief state.
    pub async fn belief(&self, claim_id: &str) -> Option<BeliefNode> {
        self.state.read().await.beliefs.get(claim_id).cloned()
    }

    pub async fn claim_count(&self) -> usize {
        self.state.read().await.beliefs.len()
    }

    /// Number of live validations across all claims.
    pub async fn validation_count(&self) -> usize {
        self.state.read().await.messages.values().map(BTreeMap::len).sum()
    }

    pub async fn is_reserved(&self, source_id: &str) -> bool {
        self.state.read().await.reserved.contains(source_id)
    }
}

/// Average confidence and success rate over opinion-bearing validations.
///
/// Records tagged with a failure kind carry no opinion and are skipped.
#[allow(clippy::cast_precision_loss)]
fn aggregate_validations<'a>(
    messages: impl Iterator<Item = &'a ValidationResult>,
) -> Option<ValidationSignal> {
    let mut count = 0usize;
    let mut confidence_sum = 0.0;
    let mut successes = 0usize;

    for result in messages.filter(|r| r.failure().is_none()) {
        count += 1;
        confidence_sum += result.confidence();
        if result.verdict() != Verdict::Reject {
            successes += 1;
        }
    }

    (count > 0).then(|| ValidationSignal {
        avg_confidence: confidence_sum / count as f64,
        success_rate: successes as f64 / count as f64,
    })
}

fn extract_consensus(beliefs: &BTreeMap<ClaimId, BeliefNode>) -> BTreeMap<ClaimId, ClaimConsensus> {
    beliefs
        .iter()
        .map(|(claim_id, node)| {
            let consensus = match node.best() {
                Some(best) => ClaimConsensus {
                    content: best.content.clone(),
                    confidence: best.score,
                    converged: node.is_converged(),
                    alternatives: node.top(TOP_ALTERNATIVES),
                },
                None => ClaimConsensus {
                    content: String::new(),
                    confidence: 0.0,
                    converged: false,
                    alternatives: Vec::new(),
                },
            };
            (Arc::clone(claim_id), consensus)
        })
        .collect()
}
