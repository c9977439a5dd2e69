//! Per-claim belief state.

use crate::types::ClaimId;
use serde::Serialize;

/// Floor applied before taking logarithms during log-domain stabilization.
const LOG_FLOOR: f64 = 1e-12;

/// One candidate content and its current score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub content: String,
    pub score: f64,
}

/// Candidate scores for one claim.
///
/// Scores are non-negative and are not forced onto a probability simplex: they are only
/// rescaled when the maximum exceeds `1.0`, so relative confidence differences survive.
/// Candidates keep first-insertion order, which also breaks ties when picking the best one.
#[derive(Debug, Clone, Serialize)]
pub struct BeliefNode {
    pub claim_id: ClaimId,
    candidates: Vec<Candidate>,
    confidence: f64,
    evidence_count: u32,
    converged: bool,
}

impl BeliefNode {
    #[must_use]
    pub fn new(claim_id: ClaimId) -> Self {
        Self {
            claim_id,
            candidates: Vec::new(),
            confidence: 0.0,
            evidence_count: 0,
            converged: false,
        }
    }

    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    #[must_use]
    pub fn score(&self, content: &str) -> Option<f64> {
        self.candidates.iter().find(|c| c.content == content).map(|c| c.score)
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    #[must_use]
    pub fn evidence_count(&self) -> u32 {
        self.evidence_count
    }

    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Folds one proposal in. New content takes the proposal's confidence; repeated content
    /// blends `old_weight * old + new_weight * new`.
    pub(crate) fn fold_proposal(
        &mut self,
        content: &str,
        confidence: f64,
        old_weight: f64,
        new_weight: f64,
    ) {
        match self.candidates.iter_mut().find(|c| c.content == content) {
            Some(candidate) => {
                candidate.score = old_weight * candidate.score + new_weight * confidence;
            }
            None => self
                .candidates
                .push(Candidate { content: content.to_string(), score: confidence }),
        }
        self.evidence_count += 1;
    }

    /// Highest-scoring candidate; the earliest inserted wins ties.
    #[must_use]
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.iter().fold(None, |best: Option<&Candidate>, candidate| match best {
            Some(current) if current.score >= candidate.score => Some(current),
            _ => Some(candidate),
        })
    }

    #[must_use]
    pub fn max_score(&self) -> f64 {
        self.best().map_or(0.0, |c| c.score)
    }

    /// Up to `n` candidates ordered by score, highest first.
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<Candidate> {
        let mut sorted = self.candidates.clone();
        sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
        sorted.truncate(n);
        sorted
    }

    pub(crate) fn snapshot_scores(&self) -> Vec<f64> {
        self.candidates.iter().map(|c| c.score).collect()
    }

    /// Multiplies every candidate by `factor`, clamping at zero.
    pub(crate) fn scale(&mut self, factor: f64) {
        for candidate in &mut self.candidates {
            candidate.score = (candidate.score * factor).max(0.0);
        }
    }

    /// Damped update toward the current scores: `damping * previous + (1 - damping) * current`.
    pub(crate) fn damp_against(&mut self, previous: &[f64], damping: f64) {
        for (candidate, old) in self.candidates.iter_mut().zip(previous) {
            candidate.score = damping * old + (1.0 - damping) * candidate.score;
        }
    }

    /// Rescales only when the maximum exceeds 1.0, then refreshes confidence and the
    /// converged flag.
    pub(crate) fn normalize(&mut self, min_confidence: f64) {
        let max = self.max_score();
        if max > 1.0 {
            for candidate in &mut self.candidates {
                candidate.score /= max;
            }
        }
        self.confidence = self.max_score();
        self.converged = self.confidence >= min_confidence;
    }

    /// Min-sum style stabilization: moves scores into the log domain, subtracts the maximum
    /// log value and maps back, then renormalizes.
    ///
    /// Every score ends up relative to the top candidate, so the top candidate is rescaled to
    /// exactly 1.0 and the claim reports confidence 1.0 and `converged` regardless of its score
    /// before the pass. Runner-up scores keep their ratio to the top.
    pub(crate) fn stabilize(&mut self, min_confidence: f64) {
        if self.candidates.is_empty() {
            return;
        }

        let logs: Vec<f64> =
            self.candidates.iter().map(|c| c.score.max(LOG_FLOOR).ln()).collect();
        let max_log = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        for (candidate, log) in self.candidates.iter_mut().zip(logs) {
            candidate.score = (log - max_log).exp();
        }
        self.normalize(min_confidence);
    }
}
