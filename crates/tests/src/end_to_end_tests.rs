//! End-to-end flows: providers answer, validators judge, the belief engine settles.
//!
//! Provider and validator breakers share one manager, as they would in a deployment, so the
//! combined breaker view is checked alongside the consensus.

use crate::mock_infrastructure::{
    create_test_claim, fast_breaker_config, init_test_logging, MockProvider, MockValidator,
};
use concord_core::{
    belief::{BeliefPropagationEngine, ConsensusStatus, ConsensusSummary, ProposalOutcome},
    circuit_breaker::{CircuitBreakerManager, CircuitBreakerState},
    redundancy::{Provider, RedundancyConfig, RedundancyOrchestrator, Strategy, Task},
    types::{Verdict, QUORUM_POOL_ID},
    validation::{ValidatorPool, ValidatorPoolConfig},
};
use std::sync::Arc;

struct Harness {
    breakers: Arc<CircuitBreakerManager>,
    orchestrator: RedundancyOrchestrator,
    pool: ValidatorPool,
    engine: BeliefPropagationEngine,
}

impl Harness {
    fn new(redundancy: RedundancyConfig, validation: ValidatorPoolConfig) -> Self {
        let breakers = Arc::new(CircuitBreakerManager::default());
        Self {
            orchestrator: RedundancyOrchestrator::new(redundancy, Arc::clone(&breakers)),
            pool: ValidatorPool::new(validation, Arc::clone(&breakers)),
            engine: BeliefPropagationEngine::default(),
            breakers,
        }
    }

    /// Runs the providers, feeds every version in as a proposal, validates the voted answer
    /// and stores the pooled verdict for `round`.
    async fn run_round(&self, claim_id: &str, providers: &[Arc<dyn Provider>], round: u64) {
        let task = Task::new(format!("answer claim {claim_id}"));
        let outcome = self
            .orchestrator
            .execute_with_redundancy(providers, &task, Strategy::Full)
            .await
            .unwrap();

        for version in &outcome.versions {
            let source = version.provider.as_str();
            let accepted = self
                .engine
                .add_proposal(claim_id, &version.content, version.confidence, source)
                .await;
            assert_eq!(accepted, ProposalOutcome::Accepted);
        }

        let claim = create_test_claim(claim_id, &outcome.content.unwrap());
        let verdict = self.pool.validate_with_quorum(&claim, 2).await;
        self.engine.add_validation(claim_id, QUORUM_POOL_ID, round, verdict).await;
    }
}

fn capital_providers() -> Vec<Arc<dyn Provider>> {
    vec![
        MockProvider::new("p0", "Paris", 0.9).shared(),
        MockProvider::new("p1", "Paris", 0.8).shared(),
        MockProvider::new("p2", "Lyon", 0.6).shared(),
    ]
}

#[tokio::test]
async fn test_providers_validators_and_engine_agree() {
    init_test_logging();
    let harness = Harness::new(RedundancyConfig::default(), ValidatorPoolConfig::default());
    harness.pool.register("facts", MockValidator::supporting(0.9));
    harness.pool.register("sources", MockValidator::supporting(0.85));
    harness.pool.register("skeptic", MockValidator::rejecting(0.3));

    harness.run_round("capital", &capital_providers(), 0).await;
    assert_eq!(harness.engine.claim_count().await, 1);
    assert_eq!(harness.engine.validation_count().await, 1);

    let result = harness.engine.propagate().await;
    let capital = &result.consensus["capital"];
    assert_eq!(capital.content, "Paris");
    assert!(capital.confidence >= 0.86);
    assert!(capital.converged);
    assert_eq!(capital.alternatives.len(), 2);
    assert_eq!(capital.alternatives[1].content, "Lyon");

    let summary = ConsensusSummary::from_result(&result);
    assert_eq!(summary.status, ConsensusStatus::StrongConsensus);

    let states = harness.breakers.get_all_states().await;
    let names: Vec<&str> = states.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "provider_p0",
            "provider_p1",
            "provider_p2",
            "validator_facts",
            "validator_skeptic",
            "validator_sources",
        ]
    );
    assert!(states.values().all(|s| s.state == CircuitBreakerState::Closed));
}

#[tokio::test]
async fn test_consensus_output_is_not_fed_back() {
    let harness = Harness::new(RedundancyConfig::default(), ValidatorPoolConfig::default());
    harness.pool.register("a", MockValidator::supporting(0.9));
    harness.pool.register("b", MockValidator::supporting(0.9));

    harness.run_round("capital", &capital_providers(), 0).await;
    let before = harness.engine.belief("capital").await.unwrap();

    for echo in [QUORUM_POOL_ID, "redundancy_consensus", "hedged_confirmation"] {
        let outcome = harness.engine.add_proposal("capital", "Paris", 1.0, echo).await;
        assert_eq!(outcome, ProposalOutcome::RejectedEcho, "{echo} must be rejected");
    }

    let after = harness.engine.belief("capital").await.unwrap();
    assert_eq!(after.evidence_count(), before.evidence_count());
    assert_eq!(after.score("Paris"), before.score("Paris"));
}

#[tokio::test]
async fn test_degraded_dependencies_still_settle() {
    let redundancy = RedundancyConfig {
        breaker: fast_breaker_config(1, 60_000),
        ..RedundancyConfig::default()
    };
    let validation = ValidatorPoolConfig {
        breaker: fast_breaker_config(1, 60_000),
        ..ValidatorPoolConfig::default()
    };
    let harness = Harness::new(redundancy, validation);
    harness.pool.register("a", MockValidator::supporting(0.9));
    harness.pool.register("b", MockValidator::supporting(0.8));
    harness.pool.register("down", MockValidator::failing());

    let mut providers = capital_providers();
    providers.push(MockProvider::failing("p3").shared());

    for round in 0..3 {
        harness.run_round("capital", &providers, round).await;
    }

    let states = harness.breakers.get_all_states().await;
    assert_eq!(states["provider_p3"].state, CircuitBreakerState::Open);
    assert_eq!(states["validator_down"].state, CircuitBreakerState::Open);
    assert_eq!(states["provider_p0"].state, CircuitBreakerState::Closed);

    assert_eq!(harness.engine.validation_count().await, 3);
    let result = harness.engine.propagate().await;
    assert_eq!(result.consensus["capital"].content, "Paris");

    let claim = create_test_claim("capital", "Paris");
    assert_eq!(harness.pool.validate_with_quorum(&claim, 2).await.verdict(), Verdict::Support);
    // default quorum of three cannot be met with one validator isolated
    let verdict = harness.pool.validate(&claim).await;
    assert_eq!(verdict.verdict(), Verdict::Abstain);
    assert!(verdict.failure().is_some());
}
