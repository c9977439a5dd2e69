//! Confidence-weighted majority vote over versions.

use super::{n_version::VersionResult, provider::is_valid_confidence};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Result of a weighted vote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteOutcome {
    /// Winning content, `None` when nothing was voted on.
    pub consensus: Option<String>,
    /// Winner's share of the total weight.
    pub confidence: f64,
    /// Votes cast for the winner.
    pub support: usize,
    pub total_votes: usize,
    /// Summed confidence per content.
    pub weights: BTreeMap<String, f64>,
}

impl VoteOutcome {
    fn empty() -> Self {
        Self {
            consensus: None,
            confidence: 0.0,
            support: 0,
            total_votes: 0,
            weights: BTreeMap::new(),
        }
    }
}

pub struct MajorityVoteAggregator;

impl MajorityVoteAggregator {
    /// Sums confidence per content over versions at or above `confidence_threshold` (all
    /// versions when none qualify) and picks the heaviest content. On equal weight the
    /// content seen first wins. Versions whose confidence is not a number in `[0, 1]` never
    /// vote.
    #[must_use]
    pub fn aggregate(results: &[VersionResult], confidence_threshold: f64) -> VoteOutcome {
        let valid: Vec<&VersionResult> =
            results.iter().filter(|r| is_valid_confidence(r.confidence)).collect();
        if valid.is_empty() {
            return VoteOutcome::empty();
        }
        if valid.len() < results.len() {
            warn!(dropped = results.len() - valid.len(), "ignoring versions with invalid confidence");
        }

        let qualified: Vec<&VersionResult> =
            valid.iter().copied().filter(|r| r.confidence >= confidence_threshold).collect();
        let voters = if qualified.is_empty() { valid } else { qualified };

        // Insertion-ordered tally so ties resolve to the earliest content.
        let mut tally: Vec<(&str, f64)> = Vec::new();
        for voter in &voters {
            match tally.iter_mut().find(|(content, _)| *content == voter.content) {
                Some((_, weight)) => *weight += voter.confidence,
                None => tally.push((voter.content.as_str(), voter.confidence)),
            }
        }

        let mut winner = tally[0];
        for entry in &tally[1..] {
            if entry.1 > winner.1 {
                winner = *entry;
            }
        }

        let total_weight: f64 = tally.iter().map(|(_, weight)| weight).sum();
        let confidence = if total_weight > 0.0 { winner.1 / total_weight } else { 0.0 };

        VoteOutcome {
            consensus: Some(winner.0.to_string()),
            confidence,
            support: voters.iter().filter(|v| v.content == winner.0).count(),
            total_votes: voters.len(),
            weights: tally.iter().map(|(content, weight)| ((*content).to_string(), *weight)).collect(),
        }
    }
}
