//! Belief propagation configuration types and defaults.

use crate::types::{HEDGED_CONFIRMATION_ID, QUORUM_POOL_ID};
use serde::{Deserialize, Serialize};

/// Configuration for the belief propagation engine.
///
/// The first four fields are the usual tuning knobs. The rest are policy constants of the
/// update rule, exposed so deployments can tune them without code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeliefConfig {
    /// Initial weight of the pre-round score in each damped update (default: 0.5)
    #[serde(default = "default_damping_factor")]
    pub damping_factor: f64,

    /// Largest per-round score change that counts as converged (default: 0.01)
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,

    /// Hard cap on propagation rounds (default: 20)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Claim confidence at which a claim is flagged converged (default: 0.7)
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    // ─────────────────────────────────────────────────────────────────────────
    // Proposal folding
    // ─────────────────────────────────────────────────────────────────────────
    /// Weight of the existing score when the same content is proposed again (default: 0.6)
    #[serde(default = "default_blend_old_weight")]
    pub blend_old_weight: f64,

    /// Weight of the incoming confidence for repeated content (default: 0.4)
    #[serde(default = "default_blend_new_weight")]
    pub blend_new_weight: f64,

    // ─────────────────────────────────────────────────────────────────────────
    // Validation influence
    // ─────────────────────────────────────────────────────────────────────────
    /// Success rate and average confidence above which validation is strongly positive
    /// (default: 0.6)
    #[serde(default = "default_positive_threshold")]
    pub positive_threshold: f64,

    /// Success rate or average confidence below which validation is strongly negative
    /// (default: 0.4)
    #[serde(default = "default_negative_threshold")]
    pub negative_threshold: f64,

    /// Multiplicative boost rate for strongly positive validation (default: 0.15)
    #[serde(default = "default_boost_rate")]
    pub boost_rate: f64,

    /// Multiplicative penalty rate for strongly negative validation (default: 0.1)
    #[serde(default = "default_penalty_rate")]
    pub penalty_rate: f64,

    /// Adjustment rate for mixed validation (default: 0.05)
    #[serde(default = "default_neutral_rate")]
    pub neutral_rate: f64,

    /// Claim score that boosts approach but never cross (default: 0.95)
    #[serde(default = "default_score_ceiling")]
    pub score_ceiling: f64,

    /// Claim score that penalties approach but never cross (default: 0.05)
    #[serde(default = "default_score_floor")]
    pub score_floor: f64,

    // ─────────────────────────────────────────────────────────────────────────
    // Oscillation control and stopping
    // ─────────────────────────────────────────────────────────────────────────
    /// Upper bound adaptive damping moves toward on oscillation (default: 0.95)
    #[serde(default = "default_max_damping")]
    pub max_damping: f64,

    /// Fraction of the remaining gap to `max_damping` closed per detection (default: 0.5)
    #[serde(default = "default_damping_step")]
    pub damping_step: f64,

    /// Tolerance for comparing deltas in period detection (default: 1e-6)
    #[serde(default = "default_oscillation_tolerance")]
    pub oscillation_tolerance: f64,

    /// Variance of the last four deltas below which progress has stalled (default: 1e-10)
    #[serde(default = "default_stagnation_variance")]
    pub stagnation_variance: f64,

    /// Consecutive non-improving rounds tolerated before stopping early (default: 5)
    #[serde(default = "default_patience")]
    pub patience: usize,

    /// Rounds always run before an early stop (default: 3)
    #[serde(default = "default_min_rounds")]
    pub min_rounds: usize,

    /// Relative delta reduction that counts as improvement (default: 0.01)
    #[serde(default = "default_min_improvement")]
    pub min_improvement: f64,

    /// System confidence bonus scaled by the fraction of converged claims (default: 0.05)
    #[serde(default = "default_convergence_bonus")]
    pub convergence_bonus: f64,

    // ─────────────────────────────────────────────────────────────────────────
    // Echo prevention
    // ─────────────────────────────────────────────────────────────────────────
    /// Source identities that may never submit proposals. Validator identities that submit
    /// validations are added at runtime.
    #[serde(default = "default_reserved_sources")]
    pub reserved_sources: Vec<String>,
}

fn default_damping_factor() -> f64 {
    0.5
}

fn default_convergence_threshold() -> f64 {
    0.01
}

fn default_max_iterations() -> usize {
    20
}

fn default_min_confidence() -> f64 {
    0.7
}

fn default_blend_old_weight() -> f64 {
    0.6
}

fn default_blend_new_weight() -> f64 {
    0.4
}

fn default_positive_threshold() -> f64 {
    0.6
}

fn default_negative_threshold() -> f64 {
    0.4
}

fn default_boost_rate() -> f64 {
    0.15
}

fn default_penalty_rate() -> f64 {
    0.1
}

fn default_neutral_rate() -> f64 {
    0.05
}

fn default_score_ceiling() -> f64 {
    0.95
}

fn default_score_floor() -> f64 {
    0.05
}

fn default_max_damping() -> f64 {
    0.95
}

fn default_damping_step() -> f64 {
    0.5
}

fn default_oscillation_tolerance() -> f64 {
    1e-6
}

fn default_stagnation_variance() -> f64 {
    1e-10
}

fn default_patience() -> usize {
    5
}

fn default_min_rounds() -> usize {
    3
}

fn default_min_improvement() -> f64 {
    0.01
}

fn default_convergence_bonus() -> f64 {
    0.05
}

fn default_reserved_sources() -> Vec<String> {
    vec![
        QUORUM_POOL_ID.to_string(),
        HEDGED_CONFIRMATION_ID.to_string(),
        "redundancy_consensus".to_string(),
        "system_aggregator".to_string(),
    ]
}

impl Default for BeliefConfig {
    fn default() -> Self {
        Self {
            damping_factor: default_damping_factor(),
            convergence_threshold: default_convergence_threshold(),
            max_iterations: default_max_iterations(),
            min_confidence: default_min_confidence(),
            blend_old_weight: default_blend_old_weight(),
            blend_new_weight: default_blend_new_weight(),
            positive_threshold: default_positive_threshold(),
            negative_threshold: default_negative_threshold(),
            boost_rate: default_boost_rate(),
            penalty_rate: default_penalty_rate(),
            neutral_rate: default_neutral_rate(),
            score_ceiling: default_score_ceiling(),
            score_floor: default_score_floor(),
            max_damping: default_max_damping(),
            damping_step: default_damping_step(),
            oscillation_tolerance: default_oscillation_tolerance(),
            stagnation_variance: default_stagnation_variance(),
            patience: default_patience(),
            min_rounds: default_min_rounds(),
            min_improvement: default_min_improvement(),
            convergence_bonus: default_convergence_bonus(),
            reserved_sources: default_reserved_sources(),
        }
    }
}

impl BeliefConfig {
    /// Checks ranges of every knob.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.damping_factor) {
            return Err("Belief damping_factor must be in [0, 1)".to_string());
        }
        if !(self.damping_factor..1.0).contains(&self.max_damping) {
            return Err("Belief max_damping must be in [damping_factor, 1)".to_string());
        }
        if self.convergence_threshold <= 0.0 {
            return Err("Belief convergence_threshold must be greater than 0".to_string());
        }
        if self.max_iterations == 0 {
            return Err("Belief max_iterations must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err("Belief min_confidence must be in [0, 1]".to_string());
        }
        if (self.blend_old_weight + self.blend_new_weight - 1.0).abs() > 1e-9 ||
            self.blend_old_weight < 0.0 ||
            self.blend_new_weight < 0.0
        {
            return Err("Belief blend weights must be non-negative and sum to 1".to_string());
        }
        let floor_ok = self.score_floor > 0.0 && self.score_floor < self.score_ceiling;
        if !floor_ok || self.score_ceiling > 1.0 {
            return Err(
                "Belief scores must satisfy 0 < score_floor < score_ceiling <= 1".to_string()
            );
        }
        if self.negative_threshold > self.positive_threshold {
            return Err("Belief negative_threshold cannot exceed positive_threshold".to_string());
        }
        if !(0.0..=1.0).contains(&self.damping_step) {
            return Err("Belief damping_step must be in [0, 1]".to_string());
        }
        if self.patience == 0 {
            return Err("Belief patience must be greater than 0".to_string());
        }
        Ok(())
    }
}
