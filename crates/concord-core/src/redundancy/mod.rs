//! # Redundancy Overview
//!
//! Spends extra provider calls to buy latency or reliability.
//!
//! ## Strategies
//!
//! 1. **Fast**: Hedged call; providers start on a staggered delay schedule and the first
//!    success wins while the rest are cancelled
//! 2. **Reliable**: Every provider runs once with diversified parameters, then a
//!    confidence-weighted vote picks the content
//! 3. **Full**: Breaker-protected n-version run over the first providers, a vote, and, when the
//!    vote is weak, a hedged confirmation from providers that did not already contribute
//!
//! ## Delay Adaptation
//!
//! Winner latencies are tracked per provider. [`HedgeExecutor::adapt_delays`] rebuilds the
//! schedule as `[0, avg p50, avg p95]` once providers have enough samples.
//!
//! # Module Organization
//!
//! - [`config`]: `RedundancyConfig`
//! - [`provider`]: `Provider` trait, `Task`, `ExecutionParams`, `ProviderResponse`
//! - [`latency_tracker`]: Sliding latency window
//! - [`hedging`]: `HedgeExecutor`
//! - [`n_version`]: `NVersionExecutor`
//! - [`voting`]: `MajorityVoteAggregator`
//! - [`orchestrator`]: `RedundancyOrchestrator` (main entry point)

pub mod config;
pub mod hedging;
pub mod latency_tracker;
pub mod n_version;
pub mod orchestrator;
pub mod provider;
pub mod voting;

pub use config::RedundancyConfig;
pub use hedging::{HedgeExecutor, HedgedResponse, LatencyStats};
pub use latency_tracker::LatencyTracker;
pub use n_version::{NVersionExecutor, VersionResult};
pub use orchestrator::{RedundancyOrchestrator, RedundancyOutcome, Strategy};
pub use provider::{ExecutionParams, Provider, ProviderResponse, Task};
pub use voting::{MajorityVoteAggregator, VoteOutcome};
