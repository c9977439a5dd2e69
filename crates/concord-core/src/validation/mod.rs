//! # Validator Pool
//!
//! Converts heterogeneous validator outputs into signed verdicts and pools them under a
//! quorum rule.
//!
//! ## Algorithm Steps
//!
//! 1. **Fan-out**: Every registered validator runs concurrently, each behind its own circuit
//!    breaker (`validator_<name>`) and a per-call timeout
//! 2. **Verdict mapping**: `valid && score > 0.7` supports, `!valid || score < 0.3` rejects,
//!    anything else abstains
//! 3. **Quorum check**: Fewer usable results than the quorum yields a zero-confidence
//!    abstention tagged `InsufficientValidators`
//! 4. **Decision**: Strict majority first, then confidence-backed plurality, then an
//!    average-confidence tie-break
//!
//! # Module Organization
//!
//! - [`config`]: Pool configuration (`ValidatorPoolConfig`)
//! - [`quorum`]: Verdict mapping and tally (`ValidatorOutput`, `QuorumTally`)
//! - [`pool`]: Orchestration (`ValidatorPool`, the `Validator` trait)

pub mod config;
pub mod pool;
pub mod quorum;

pub use config::ValidatorPoolConfig;
pub use pool::{PoolStatus, QuorumReport, Validator, ValidatorCall, ValidatorPool};
pub use quorum::{output_to_verdict, QuorumTally, ValidatorOutput};
