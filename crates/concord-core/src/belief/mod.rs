//! # Belief Propagation Overview
//!
//! The belief engine merges candidate contents proposed for each claim with the verdicts
//! validators issued about that claim, and iterates the scores to a stable consensus.
//!
//! ## Algorithm Steps
//!
//! 1. **Intake**: Proposals blend into per-claim candidate scores; validations are stored once
//!    per `(claim, validator, round)`
//! 2. **Aggregation**: Each claim's validations collapse to an average confidence and a success
//!    rate
//! 3. **Update**: One bounded factor per claim scales every candidate, so candidate ratios are
//!    preserved
//! 4. **Damping**: New scores are mixed with the previous round's by an adaptive damping factor
//! 5. **Stopping**: Converge on a small delta, raise damping and stabilize on oscillation, and
//!    give up early when progress stalls
//!
//! ## Echo Prevention
//!
//! Only [`SourceRole::Proposer`](crate::types::SourceRole) sources may propose content. Any
//! identity that has submitted a validation, plus the configured aggregator identities, is
//! reserved and rejected as a proposer.
//!
//! # Module Organization
//!
//! - [`config`]: Tuning constants (`BeliefConfig`)
//! - [`node`]: Per-claim candidate scores (`BeliefNode`)
//! - [`oscillation`]: Delta history and pattern detection
//! - [`engine`]: Orchestration (`BeliefPropagationEngine` - main entry point)
//! - [`summary`]: Cross-claim agreement summary

pub mod config;
pub mod engine;
pub mod node;
pub mod oscillation;
pub mod summary;

#[cfg(test)]
mod tests;

pub use config::BeliefConfig;
pub use engine::{BeliefPropagationEngine, ClaimConsensus, PropagationResult, ProposalOutcome};
pub use node::{BeliefNode, Candidate};
pub use oscillation::{detect_oscillation, OscillationPattern};
pub use summary::{AgreementLevel, ConsensusStatus, ConsensusSummary};
