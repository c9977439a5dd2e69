//! Mock Infrastructure for Testing the Concord Decision Core
//!
//! Reusable validators and providers with scripted behaviour, so pool, breaker and redundancy
//! paths can be exercised without real models or services.
//!
//! ## Components
//!
//! - `MockValidator`: Fixed output, failure or latency, with a call counter
//! - `MockProvider`: Fixed response, failure or latency, with call records that show whether
//!   a call completed or was cancelled mid-flight
//! - Test helpers for logging and claim construction
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{MockProvider, MockValidator};
//!
//! let slow = MockProvider::new("slow", "answer", 0.9).with_latency_ms(500);
//! let record = slow.calls();
//! // ... race it ...
//! assert!(record.was_cancelled());
//! ```

pub mod providers;

pub use providers::{CallRecord, MockProvider};
pub use test_helpers::*;
pub use validators::MockValidator;
