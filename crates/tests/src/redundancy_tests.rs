//! Integration tests for hedging, n-version execution and the redundancy orchestrator.
//!
//! Hedged calls are checked with real timers so that cancellation of the losing calls is
//! observable through the provider call records.

use crate::mock_infrastructure::{fast_breaker_config, init_test_logging, MockProvider};
use concord_core::{
    circuit_breaker::{CircuitBreakerManager, CircuitBreakerState},
    errors::RedundancyError,
    redundancy::{
        HedgeExecutor, NVersionExecutor, Provider, RedundancyConfig, RedundancyOrchestrator,
        Strategy, Task,
    },
    types::HEDGED_CONFIRMATION_ID,
};
use std::{sync::Arc, time::Duration};

fn hedge_config(delays_ms: &[u64]) -> RedundancyConfig {
    RedundancyConfig { hedge_delays_ms: delays_ms.to_vec(), ..RedundancyConfig::default() }
}

fn orchestrator(config: RedundancyConfig) -> (RedundancyOrchestrator, Arc<CircuitBreakerManager>) {
    let breakers = Arc::new(CircuitBreakerManager::default());
    (RedundancyOrchestrator::new(config, Arc::clone(&breakers)), breakers)
}

fn task() -> Task {
    Task::new("summarise the incident report").with_kind("summary")
}

// ─────────────────────────────────────────────────────────────────────────────
// Hedged calls
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_hedged_call_cancels_slow_primary() {
    init_test_logging();
    let hedge = HedgeExecutor::new(&hedge_config(&[0, 100]));

    let slow = MockProvider::new("slow", "late answer", 0.9).with_latency_ms(500);
    let fast = MockProvider::new("fast", "quick answer", 0.8).with_latency_ms(50);
    let slow_calls = slow.calls();
    let fast_calls = fast.calls();

    let won = hedge.hedged_call(&[slow.shared(), fast.shared()], &task()).await.unwrap();

    assert_eq!(won.provider, "fast");
    assert_eq!(won.hedge_index, 1);
    assert_eq!(won.response.content, "quick answer");
    assert!(won.latency >= Duration::from_millis(150));
    assert!(won.latency < Duration::from_millis(500));

    assert_eq!(fast_calls.completed(), 1);
    assert_eq!(slow_calls.started(), 1);
    assert_eq!(slow_calls.completed(), 0);
    assert!(slow_calls.was_cancelled());
}

#[tokio::test]
async fn test_failed_primary_falls_through_to_hedge() {
    let hedge = HedgeExecutor::new(&hedge_config(&[0, 60]));
    let providers =
        [MockProvider::failing("down").shared(), MockProvider::new("up", "ok", 0.7).shared()];

    let won = hedge.hedged_call(&providers, &task()).await.unwrap();

    assert_eq!(won.provider, "up");
    assert_eq!(won.hedge_index, 1);
    assert!(won.latency >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_all_hedged_providers_fail() {
    let hedge = HedgeExecutor::new(&hedge_config(&[0, 10, 20]));
    let providers = [MockProvider::failing("a").shared(), MockProvider::failing("b").shared()];

    let error = hedge.hedged_call(&providers, &task()).await.unwrap_err();
    assert!(matches!(error, RedundancyError::AllProvidersFailed { attempted: 2 }));

    let error = hedge.hedged_call(&[], &task()).await.unwrap_err();
    assert!(matches!(error, RedundancyError::NoProviders));
}

#[tokio::test]
async fn test_launches_bounded_by_delay_schedule() {
    let hedge = HedgeExecutor::new(&hedge_config(&[0, 200]));
    let first = MockProvider::new("first", "x", 0.9);
    let second = MockProvider::new("second", "y", 0.9);
    let third = MockProvider::new("third", "z", 0.9);
    let (second_calls, third_calls) = (second.calls(), third.calls());

    let won = hedge
        .hedged_call(&[first.shared(), second.shared(), third.shared()], &task())
        .await
        .unwrap();

    assert_eq!(won.provider, "first");
    assert_eq!(second_calls.started(), 0, "hedge still waiting on its delay when aborted");
    assert_eq!(third_calls.started(), 0, "no delay slot for a third launch");
}

#[tokio::test]
async fn test_winner_latency_is_tracked() {
    let hedge = HedgeExecutor::new(&hedge_config(&[0]));
    let provider = MockProvider::new("tracked", "x", 0.9).with_latency_ms(20).shared();

    hedge.hedged_call(&[Arc::clone(&provider)], &task()).await.unwrap();
    hedge.hedged_call(&[provider], &task()).await.unwrap();

    let stats = hedge.get_latency_stats("tracked").unwrap();
    assert_eq!(stats.samples, 2);
    assert!(stats.p50 >= Duration::from_millis(20));
    assert!(hedge.get_latency_stats("unknown").is_none());

    hedge.clear_latency_data();
    assert!(hedge.get_latency_stats("tracked").is_none());
}

#[tokio::test]
async fn test_adapt_delays_from_recorded_latency() {
    let hedge = HedgeExecutor::new(&RedundancyConfig::default());
    assert!(hedge.adapt_delays().is_none());

    for _ in 0..10 {
        hedge.record_latency("a", Duration::from_millis(40));
        hedge.record_latency("b", Duration::from_millis(80));
    }
    // below the sample minimum, ignored
    for _ in 0..5 {
        hedge.record_latency("c", Duration::from_millis(1_000));
    }

    let expected = vec![Duration::ZERO, Duration::from_millis(60), Duration::from_millis(60)];
    assert_eq!(hedge.adapt_delays(), Some(expected.clone()));
    assert_eq!(hedge.delays(), expected);
}

// ─────────────────────────────────────────────────────────────────────────────
// N-version execution
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_n_versions_keep_successes_in_order() {
    let executor = NVersionExecutor::new(3);
    let providers: Vec<Arc<dyn Provider>> = vec![
        MockProvider::new("a", "x", 0.9).with_latency_ms(30).shared(),
        MockProvider::failing("b").shared(),
        MockProvider::new("c", "y", 0.6).shared(),
    ];

    let versions = executor.execute_n_versions(&providers, &task()).await;

    assert_eq!(versions.len(), 2);
    assert_eq!((versions[0].provider.as_str(), versions[0].version), ("a", 0));
    assert_eq!((versions[1].provider.as_str(), versions[1].version), ("c", 2));
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator strategies
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fast_strategy_uses_single_hedged_answer() {
    let (orchestrator, _) = orchestrator(hedge_config(&[0, 50]));
    let providers = [
        MockProvider::new("primary", "x", 0.8).with_latency_ms(10).shared(),
        MockProvider::new("backup", "y", 0.9).shared(),
    ];

    let outcome =
        orchestrator.execute_with_redundancy(&providers, &task(), Strategy::Fast).await.unwrap();

    assert_eq!(outcome.strategy, Strategy::Fast);
    assert_eq!(outcome.content.as_deref(), Some("x"));
    assert_eq!(outcome.redundancy_level, 1);
    assert!(outcome.vote.is_none());
}

#[tokio::test]
async fn test_reliable_strategy_votes() {
    let (orchestrator, _) = orchestrator(RedundancyConfig::default());
    let providers = [
        MockProvider::new("a", "x", 0.9).shared(),
        MockProvider::new("b", "x", 0.8).shared(),
        MockProvider::new("c", "y", 0.7).shared(),
    ];

    let outcome = orchestrator
        .execute_with_redundancy(&providers, &task(), Strategy::Reliable)
        .await
        .unwrap();

    assert_eq!(outcome.content.as_deref(), Some("x"));
    assert!((outcome.confidence - 1.7 / 2.4).abs() < 1e-9);
    assert_eq!(outcome.redundancy_level, 3);
    assert!(!outcome.confirmed);
}

#[tokio::test]
async fn test_reliable_strategy_with_no_answers() {
    let (orchestrator, _) = orchestrator(RedundancyConfig::default());
    let providers = [MockProvider::failing("a").shared(), MockProvider::failing("b").shared()];

    let outcome = orchestrator
        .execute_with_redundancy(&providers, &task(), Strategy::Reliable)
        .await
        .unwrap();

    assert!(outcome.content.is_none());
    assert_eq!(outcome.redundancy_level, 0);
}

#[tokio::test]
async fn test_full_strategy_confirms_weak_vote() {
    let (orchestrator, _) = orchestrator(RedundancyConfig::default());
    let mut providers: Vec<Arc<dyn Provider>> = ["x", "y", "z", "w", "v"]
        .iter()
        .enumerate()
        .map(|(i, content)| MockProvider::new(&format!("p{i}"), content, 0.6).shared())
        .collect();
    let reserve = MockProvider::new("reserve", "x", 0.8);
    let reserve_calls = reserve.calls();
    providers.push(reserve.shared());

    let outcome =
        orchestrator.execute_with_redundancy(&providers, &task(), Strategy::Full).await.unwrap();

    assert!(outcome.confirmed);
    assert_eq!(reserve_calls.completed(), 1);
    assert_eq!(outcome.redundancy_level, 6);
    assert_eq!(outcome.content.as_deref(), Some("x"));

    let confirmation = outcome.versions.last().unwrap();
    assert_eq!(confirmation.provider, HEDGED_CONFIRMATION_ID);
    assert!((confirmation.confidence - 0.88).abs() < 1e-9);
    assert!((outcome.confidence - 1.48 / 3.88).abs() < 1e-9);
}

#[tokio::test]
async fn test_full_strategy_skips_confirmation_on_strong_vote() {
    let (orchestrator, _) = orchestrator(RedundancyConfig::default());
    let providers: Vec<Arc<dyn Provider>> = (0..4)
        .map(|i| MockProvider::new(&format!("p{i}"), "agreed", 0.9).shared())
        .collect();

    let outcome =
        orchestrator.execute_with_redundancy(&providers, &task(), Strategy::Full).await.unwrap();

    assert!(!outcome.confirmed);
    assert!((outcome.confidence - 1.0).abs() < 1e-12);
    assert_eq!(outcome.redundancy_level, 4);
}

#[tokio::test]
async fn test_full_strategy_isolates_failing_provider() {
    let config = RedundancyConfig {
        breaker: fast_breaker_config(1, 60_000),
        ..RedundancyConfig::default()
    };
    let (orchestrator, breakers) = orchestrator(config);
    let broken = MockProvider::failing("broken");
    let broken_calls = broken.calls();
    let providers = [
        MockProvider::new("a", "x", 0.9).shared(),
        MockProvider::new("b", "x", 0.9).shared(),
        broken.shared(),
    ];

    for _ in 0..2 {
        let outcome = orchestrator
            .execute_with_redundancy(&providers, &task(), Strategy::Full)
            .await
            .unwrap();
        assert_eq!(outcome.content.as_deref(), Some("x"));
        assert_eq!(outcome.redundancy_level, 2);
    }

    assert_eq!(broken_calls.started(), 1, "open breaker must skip the provider");
    let states = breakers.get_all_states().await;
    assert_eq!(states["provider_broken"].state, CircuitBreakerState::Open);
    assert_eq!(states["provider_a"].state, CircuitBreakerState::Closed);
}

#[tokio::test]
async fn test_weak_vote_skips_confirmation_from_isolated_provider() {
    let config = RedundancyConfig {
        breaker: fast_breaker_config(1, 60_000),
        ..RedundancyConfig::default()
    };
    let (orchestrator, breakers) = orchestrator(config);
    let broken = MockProvider::failing("broken");
    let broken_calls = broken.calls();
    let providers = [
        MockProvider::new("a", "x", 0.9).shared(),
        MockProvider::new("b", "y", 0.8).shared(),
        broken.shared(),
    ];

    for _ in 0..2 {
        let outcome = orchestrator
            .execute_with_redundancy(&providers, &task(), Strategy::Full)
            .await
            .unwrap();
        assert!(!outcome.confirmed);
        assert_eq!(outcome.content.as_deref(), Some("x"));
        assert!(outcome.confidence < 0.7);
    }

    assert_eq!(broken_calls.started(), 1, "isolated provider must not be asked to confirm");
    let states = breakers.get_all_states().await;
    assert_eq!(states["provider_broken"].state, CircuitBreakerState::Open);
    assert_eq!(states["provider_broken"].failure_count, 1);
}

#[tokio::test]
async fn test_hedged_confirmation_failure_isolates_reserve() {
    let config = RedundancyConfig {
        breaker: fast_breaker_config(1, 60_000),
        full_max_providers: 2,
        ..RedundancyConfig::default()
    };
    let (orchestrator, breakers) = orchestrator(config);
    let reserve = MockProvider::failing("reserve");
    let reserve_calls = reserve.calls();
    let providers = [
        MockProvider::new("a", "x", 0.6).shared(),
        MockProvider::new("b", "y", 0.6).shared(),
        reserve.shared(),
    ];

    for _ in 0..3 {
        let outcome = orchestrator
            .execute_with_redundancy(&providers, &task(), Strategy::Full)
            .await
            .unwrap();
        assert!(!outcome.confirmed);
    }

    assert_eq!(reserve_calls.started(), 1);
    let states = breakers.get_all_states().await;
    assert_eq!(states["provider_reserve"].state, CircuitBreakerState::Open);
}

#[tokio::test]
async fn test_out_of_range_confidence_never_votes() {
    let (orchestrator, breakers) = orchestrator(RedundancyConfig::default());
    let providers = [
        MockProvider::new("sane", "x", 0.7).shared(),
        MockProvider::new("inflated", "y", 40.0).shared(),
        MockProvider::new("undefined", "y", f64::NAN).shared(),
    ];

    let reliable = orchestrator
        .execute_with_redundancy(&providers, &task(), Strategy::Reliable)
        .await
        .unwrap();
    assert_eq!(reliable.content.as_deref(), Some("x"));
    assert_eq!(reliable.redundancy_level, 1);

    let full =
        orchestrator.execute_with_redundancy(&providers, &task(), Strategy::Full).await.unwrap();
    assert_eq!(full.content.as_deref(), Some("x"));
    assert!((full.confidence - 1.0).abs() < 1e-12);
    assert_eq!(breakers.get_breaker("provider_inflated").failure_count().await, 1);

    let reordered = [Arc::clone(&providers[1]), Arc::clone(&providers[0])];
    let fast =
        orchestrator.execute_with_redundancy(&reordered, &task(), Strategy::Fast).await.unwrap();
    assert_eq!(fast.versions[0].provider, "sane");
}

#[tokio::test]
async fn test_full_strategy_without_versions() {
    let (orchestrator, _) = orchestrator(RedundancyConfig::default());
    let providers = [MockProvider::failing("a").shared(), MockProvider::failing("b").shared()];

    let error = orchestrator
        .execute_with_redundancy(&providers, &task(), Strategy::Full)
        .await
        .unwrap_err();

    assert!(matches!(error, RedundancyError::NoValidResults { attempted: 2 }));
}
