//! # Concord Core
//!
//! Decision core for multi-agent claim verification: candidate contents are proposed for
//! claims, validators judge them, and the core settles on a consensus it can attach a
//! confidence to.
//!
//! This crate provides:
//!
//! - **[`belief`]**: Damped, oscillation-aware belief propagation over proposals and
//!   validations, with structural echo prevention.
//!
//! - **[`validation`]**: A validator pool that fans a claim out to registered validators and
//!   issues a quorum verdict.
//!
//! - **[`circuit_breaker`]**: Per-dependency breakers and the shared manager that validator
//!   and provider calls run through.
//!
//! - **[`redundancy`]**: Hedged calls, n-version execution and weighted majority voting
//!   behind one orchestrator.
//!
//! - **[`config`]**, **[`logging`]**, **[`metrics`]**: Layered configuration, subscriber setup
//!   and metric recording helpers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Host process                         │
//! │  ┌───────────────┐  ┌───────────────┐  ┌──────────────────┐  │
//! │  │ ValidatorPool │  │  Redundancy   │  │ BeliefPropagation│  │
//! │  │   (quorum)    │  │ Orchestrator  │  │      Engine      │  │
//! │  └───────┬───────┘  └───────┬───────┘  └────────▲─────────┘  │
//! │          │                  │                   │            │
//! │  ┌───────▼──────────────────▼───────┐   proposals and        │
//! │  │      CircuitBreakerManager       │   validations          │
//! │  │ validator_<name>, provider_<name>│                        │
//! │  └──────────────────────────────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Claim Flow
//!
//! ```text
//! Proposers ──► add_proposal ──► BeliefNode candidates
//!                                      │
//! ValidatorPool ──► validate_with_quorum ──► add_validation
//!                                      │
//!                                      ▼
//!                                 propagate()
//!                                      │
//!                                      ▼
//!                    PropagationResult (consensus per claim,
//!                    system confidence, convergence, damping)
//! ```

pub mod belief;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod redundancy;
pub mod types;
pub mod validation;
