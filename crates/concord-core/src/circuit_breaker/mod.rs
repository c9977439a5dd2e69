//! # Circuit Breakers
//!
//! Per-key failure isolation for validators and execution providers.
//!
//! ## State Machine
//!
//! ```text
//!            failure_count >= failure_threshold
//!   Closed ──────────────────────────────────────▶ Open
//!     ▲                                             │
//!     │ success_count >= success_threshold          │ reset_timeout elapsed
//!     │                                             ▼
//!     └──────────────────────────────────────── HalfOpen
//!                 any probe failure ──▶ Open
//! ```
//!
//! `HalfOpen` admits at most `half_open_max_calls` probes.
//!
//! # Module Organization
//!
//! - [`config`]: Thresholds and timeouts (`CircuitBreakerConfig`)
//! - [`breaker`]: The single-key state machine (`CircuitBreaker`)
//! - [`manager`]: Keyed registry and protected execution (`CircuitBreakerManager`)

pub mod breaker;
pub mod config;
pub mod manager;

pub use breaker::{BreakerSnapshot, CallPermit, CircuitBreaker, CircuitBreakerState};
pub use config::CircuitBreakerConfig;
pub use manager::CircuitBreakerManager;
