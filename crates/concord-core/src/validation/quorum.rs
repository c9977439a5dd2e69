//! Quorum tally and verdict decision.
//!
//! Stateless functions that turn individual validator outputs into signed verdicts and a set
//! of usable verdicts into one pooled verdict.
//!
//! # Key Functions
//!
//! - [`output_to_verdict`]: Maps a raw validator output onto support / reject / abstain
//! - [`QuorumTally::from_results`]: Counts verdicts and averages confidence
//! - [`QuorumTally::decide`]: Applies the majority-then-plurality decision order

use super::config::ValidatorPoolConfig;
use crate::types::{ValidationResult, Verdict};
use serde::{Deserialize, Serialize};

/// Raw judgement returned by a validator before it is turned into a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorOutput {
    pub valid: bool,
    pub score: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl ValidatorOutput {
    #[must_use]
    pub fn new(valid: bool, score: f64) -> Self {
        Self { valid, score, evidence: Vec::new(), issues: Vec::new() }
    }

    #[must_use]
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    #[must_use]
    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }
}

/// Maps a validator output onto a verdict.
///
/// Support needs a valid output scoring above `support_score`; anything invalid or scoring
/// below `reject_score` is a rejection; the band in between abstains.
#[must_use]
pub fn output_to_verdict(output: &ValidatorOutput, config: &ValidatorPoolConfig) -> Verdict {
    if output.valid && output.score > config.support_score {
        Verdict::Support
    } else if !output.valid || output.score < config.reject_score {
        Verdict::Reject
    } else {
        Verdict::Abstain
    }
}

/// Verdict counts over the usable results of one pool run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuorumTally {
    pub support: usize,
    pub reject: usize,
    pub abstain: usize,
    pub avg_confidence: f64,
    pub total_llr: f64,
}

impl QuorumTally {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let mut tally = Self {
            support: 0,
            reject: 0,
            abstain: 0,
            avg_confidence: 0.0,
            total_llr: 0.0,
        };

        let mut confidence_sum = 0.0;
        for result in results {
            match result.verdict() {
                Verdict::Support => tally.support += 1,
                Verdict::Reject => tally.reject += 1,
                Verdict::Abstain => tally.abstain += 1,
            }
            confidence_sum += result.confidence();
            tally.total_llr += result.llr();
        }

        if !results.is_empty() {
            tally.avg_confidence = confidence_sum / results.len() as f64;
        }
        tally
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.support + self.reject + self.abstain
    }

    /// Decides the pooled verdict.
    ///
    /// 1. Strict majority of support wins, then strict majority of reject.
    /// 2. Otherwise the plurality side wins only if average confidence backs it
    ///    (`> 0.6` for support, `< 0.4` for reject), else abstain.
    /// 3. A tie between support and reject falls back to average confidence alone.
    #[must_use]
    pub fn decide(&self) -> Verdict {
        let total = self.total();

        if self.support * 2 > total {
            return Verdict::Support;
        }
        if self.reject * 2 > total {
            return Verdict::Reject;
        }

        match self.support.cmp(&self.reject) {
            std::cmp::Ordering::Greater if self.avg_confidence > 0.6 => Verdict::Support,
            std::cmp::Ordering::Less if self.avg_confidence < 0.4 => Verdict::Reject,
            std::cmp::Ordering::Greater | std::cmp::Ordering::Less => Verdict::Abstain,
            std::cmp::Ordering::Equal => {
                if self.avg_confidence > 0.7 {
                    Verdict::Support
                } else if self.avg_confidence < 0.3 {
                    Verdict::Reject
                } else {
                    Verdict::Abstain
                }
            }
        }
    }
}
