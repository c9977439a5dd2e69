//! Tests for the belief module.
//!
//! Tests are organized by component:
//! - `engine_tests`: Tests for `BeliefPropagationEngine` intake and propagation
//! - Unit tests for nodes, oscillation detection and summaries are in their respective modules
