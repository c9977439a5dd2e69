//! Integration tests for the validator pool.
//!
//! These tests verify quorum decisions in realistic scenarios:
//! - Majority and plurality verdicts over mixed panels
//! - Failing validators are isolated by their own breaker and reported, not fatal
//! - Slow validators time out and count against the quorum
//! - Registry changes take effect on the next run

use crate::mock_infrastructure::{
    create_test_claim, create_test_pool, fast_breaker_config, init_test_logging, MockValidator,
};
use concord_core::{
    circuit_breaker::CircuitBreakerState,
    types::{CallOutcome, ValidationFailure, Verdict, QUORUM_POOL_ID},
    validation::ValidatorPoolConfig,
};
use std::time::Duration;

#[tokio::test]
async fn test_two_supports_and_a_reject_reach_support() {
    init_test_logging();
    let (pool, _) = create_test_pool(ValidatorPoolConfig::default());
    pool.register("fact_check", MockValidator::supporting(0.9));
    pool.register("source_check", MockValidator::supporting(0.8));
    pool.register("skeptic", MockValidator::rejecting(0.6));

    let result = pool.validate_with_quorum(&create_test_claim("c1", "A"), 2).await;

    assert_eq!(result.verdict(), Verdict::Support);
    assert_eq!(result.validator_id(), QUORUM_POOL_ID);
    assert!((result.confidence() - (0.9 + 0.8 + 0.6) / 3.0).abs() < 1e-9);
    assert!(result.failure().is_none());
    assert_eq!(result.evidence().len(), 2);
    assert_eq!(result.errors(), ["contradicts sources".to_string()]);
}

#[tokio::test]
async fn test_report_exposes_tally_and_calls() {
    let (pool, _) = create_test_pool(ValidatorPoolConfig::default());
    pool.register("a", MockValidator::supporting(0.9));
    pool.register("b", MockValidator::rejecting(0.2));
    pool.register("c", std::sync::Arc::new(MockValidator::new(true, 0.5)));

    let report = pool.validate_with_report(&create_test_claim("c1", "A"), 3).await;

    assert_eq!(report.tally.support, 1);
    assert_eq!(report.tally.reject, 1);
    assert_eq!(report.tally.abstain, 1);
    assert_eq!(report.usable_count(), 3);
    // tie between support and reject, average confidence 0.533 falls in the abstain band
    assert_eq!(report.result.verdict(), Verdict::Abstain);
    assert!(matches!(report.calls[2].outcome, CallOutcome::Abstained(_)));
}

#[tokio::test]
async fn test_insufficient_quorum_abstains() {
    let (pool, _) = create_test_pool(ValidatorPoolConfig::default());
    pool.register("ok", MockValidator::supporting(0.9));
    pool.register("broken", MockValidator::failing());

    let result = pool.validate_with_quorum(&create_test_claim("c1", "A"), 2).await;

    assert_eq!(result.verdict(), Verdict::Abstain);
    assert_eq!(result.confidence(), 0.0);
    assert!(matches!(
        result.failure(),
        Some(ValidationFailure::InsufficientValidators { succeeded: 1, required: 2 })
    ));
    assert!(result.errors().iter().any(|e| e.contains("only 1 validators succeeded")));
    assert!(result.errors().iter().any(|e| e.contains("validator broken failed")));
}

#[tokio::test]
async fn test_no_validators_registered() {
    let (pool, _) = create_test_pool(ValidatorPoolConfig::default());
    let result = pool.validate(&create_test_claim("c1", "A")).await;

    assert_eq!(result.verdict(), Verdict::Abstain);
    assert!(matches!(result.failure(), Some(ValidationFailure::NoValidators)));
}

#[tokio::test]
async fn test_failing_validator_is_isolated_by_breaker() {
    let config = ValidatorPoolConfig {
        breaker: fast_breaker_config(2, 60_000),
        ..ValidatorPoolConfig::default()
    };
    let (pool, breakers) = create_test_pool(config);
    let flaky = MockValidator::failing();
    pool.register("a", MockValidator::supporting(0.9));
    pool.register("b", MockValidator::supporting(0.85));
    pool.register("flaky", flaky.clone());

    let claim = create_test_claim("c1", "A");
    for _ in 0..2 {
        let result = pool.validate_with_quorum(&claim, 2).await;
        assert_eq!(result.verdict(), Verdict::Support);
    }
    assert_eq!(flaky.calls(), 2);

    let report = pool.validate_with_report(&claim, 2).await;
    assert_eq!(flaky.calls(), 2, "open breaker must not invoke the validator");
    assert!(matches!(report.calls[2].outcome, CallOutcome::CircuitOpen));
    assert!(report
        .result
        .errors()
        .iter()
        .any(|e| e == "circuit breaker open for validator flaky"));

    let states = breakers.get_all_states().await;
    assert_eq!(states["validator_flaky"].state, CircuitBreakerState::Open);
    assert_eq!(states["validator_a"].state, CircuitBreakerState::Closed);
}

#[tokio::test]
async fn test_breaker_recovers_when_validator_heals() {
    let config = ValidatorPoolConfig {
        breaker: fast_breaker_config(1, 40),
        ..ValidatorPoolConfig::default()
    };
    let (pool, breakers) = create_test_pool(config);
    let flaky = MockValidator::failing();
    pool.register("flaky", flaky.clone());

    let claim = create_test_claim("c1", "A");
    pool.validate_with_quorum(&claim, 1).await;
    assert_eq!(
        breakers.get_breaker("validator_flaky").state().await,
        CircuitBreakerState::Open
    );

    flaky.set_failing(false);
    tokio::time::sleep(Duration::from_millis(70)).await;

    let result = pool.validate_with_quorum(&claim, 1).await;
    assert_eq!(result.verdict(), Verdict::Support);
    assert_eq!(
        breakers.get_breaker("validator_flaky").state().await,
        CircuitBreakerState::Closed
    );
}

#[tokio::test]
async fn test_slow_validator_times_out() {
    let config = ValidatorPoolConfig { validator_timeout_ms: 30, ..ValidatorPoolConfig::default() };
    let (pool, _) = create_test_pool(config);
    pool.register("fast", MockValidator::supporting(0.9));
    pool.register("slow", std::sync::Arc::new(MockValidator::new(true, 0.9).with_latency_ms(500)));

    let report = pool.validate_with_report(&create_test_claim("c1", "A"), 1).await;

    assert_eq!(report.result.verdict(), Verdict::Support);
    assert!(matches!(
        &report.calls[1].outcome,
        CallOutcome::ExecutionFailed(message) if message.contains("timed out")
    ));
}

#[tokio::test]
async fn test_registry_changes() {
    let (pool, _) = create_test_pool(ValidatorPoolConfig::default());
    pool.register("a", MockValidator::rejecting(0.1));
    pool.register("a", MockValidator::supporting(0.9));
    pool.register("b", MockValidator::supporting(0.9));

    assert_eq!(pool.validator_count(), 2);
    let result = pool.validate_with_quorum(&create_test_claim("c", "x"), 2).await;
    assert_eq!(result.verdict(), Verdict::Support);

    assert!(pool.unregister("b"));
    assert!(!pool.unregister("b"));
    assert_eq!(pool.status().validators, vec!["a".to_string()]);
}
