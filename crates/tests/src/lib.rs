//! Integration Tests for the Concord Decision Core
//!
//! This crate contains various test modules:
//!
//! - `belief_propagation_tests`: Engine behaviour driven through public APIs, plus properties
//! - `validator_pool_tests`: Quorum decisions, breaker isolation and timeouts in the pool
//! - `circuit_breaker_tests`: Breaker state machine and manager integration
//! - `redundancy_tests`: Hedged calls with cancellation, n-version runs and strategies
//! - `end_to_end_tests`: Providers, validators and the belief engine wired together
//! - `mock_infrastructure`: Reusable mock validators and providers
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! Set `RUST_LOG=concord_core=debug` to see engine and breaker logs for a failing test.


#[cfg(test)]
mod validator_pool_tests;


#[cfg(test)]
mod redundancy_tests;

#[cfg(test)]
mod end_to_end_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
