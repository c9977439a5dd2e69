//! Cross-claim summary of a propagation result.

use super::engine::PropagationResult;
use serde::Serialize;

const HIGH_CONFIDENCE: f64 = 0.7;
const LOW_CONFIDENCE: f64 = 0.3;

/// Variance of a `[0, 1]` variable peaks at 0.25.
const MAX_VARIANCE: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementLevel {
    Strong,
    Moderate,
    Weak,
    Poor,
}

impl AgreementLevel {
    fn from_strength(strength: f64) -> Self {
        if strength > 0.8 {
            Self::Strong
        } else if strength > 0.6 {
            Self::Moderate
        } else if strength > 0.4 {
            Self::Weak
        } else {
            Self::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStatus {
    StrongConsensus,
    ModerateConsensus,
    AgreementButLowConfidence,
    NoConsensus,
    NoBeliefs,
}

/// How much the per-claim confidences agree with each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusSummary {
    pub strength: f64,
    pub mean_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    pub spread: f64,
    pub high_confidence_claims: usize,
    pub low_confidence_claims: usize,
    pub agreement: AgreementLevel,
    pub status: ConsensusStatus,
}

impl ConsensusSummary {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_result(result: &PropagationResult) -> Self {
        let confidences: Vec<f64> = result.consensus.values().map(|c| c.confidence).collect();

        if confidences.is_empty() {
            return Self {
                strength: 0.0,
                mean_confidence: 0.0,
                min_confidence: 0.0,
                max_confidence: 0.0,
                spread: 0.0,
                high_confidence_claims: 0,
                low_confidence_claims: 0,
                agreement: AgreementLevel::Poor,
                status: ConsensusStatus::NoBeliefs,
            };
        }

        let count = confidences.len() as f64;
        let mean = confidences.iter().sum::<f64>() / count;
        let variance = confidences.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / count;
        let strength = (1.0 - variance / MAX_VARIANCE).max(0.0);
        let min = confidences.iter().copied().fold(f64::INFINITY, f64::min);
        let max = confidences.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let status = if mean > 0.7 && strength > 0.6 {
            ConsensusStatus::StrongConsensus
        } else if mean > 0.5 && strength > 0.4 {
            ConsensusStatus::ModerateConsensus
        } else if strength > 0.6 {
            ConsensusStatus::AgreementButLowConfidence
        } else {
            ConsensusStatus::NoConsensus
        };

        Self {
            strength,
            mean_confidence: mean,
            min_confidence: min,
            max_confidence: max,
            spread: max - min,
            high_confidence_claims: confidences.iter().filter(|c| **c > HIGH_CONFIDENCE).count(),
            low_confidence_claims: confidences.iter().filter(|c| **c < LOW_CONFIDENCE).count(),
            agreement: AgreementLevel::from_strength(strength),
            status,
        }
    }
}
