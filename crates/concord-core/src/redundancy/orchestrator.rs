//! Strategy selection over hedging, n-version execution and voting.

use super::{
    config::RedundancyConfig,
    hedging::HedgeExecutor,
    n_version::{NVersionExecutor, VersionResult},
    provider::{ExecutionParams, Provider, ProviderResponse, Task},
    voting::{MajorityVoteAggregator, VoteOutcome},
};
use crate::{
    circuit_breaker::{CircuitBreakerConfig, CircuitBreakerManager},
    errors::{BreakerError, ProviderError, RedundancyError},
    types::HEDGED_CONFIRMATION_ID,
};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, sync::Arc};
use tracing::{debug, info, warn};

/// How much redundancy to spend on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// First successful hedged response.
    Fast,
    /// N-version execution plus a weighted vote.
    Reliable,
    /// Breaker-protected n-version execution, vote, and a hedged confirmation when the vote
    /// is weak.
    #[default]
    Full,
}

impl Strategy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Reliable => "reliable",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`RedundancyOrchestrator::execute_with_redundancy`].
#[derive(Debug, Clone, Serialize)]
pub struct RedundancyOutcome {
    pub strategy: Strategy,
    /// Selected content, `None` only when a reliable run produced no versions.
    pub content: Option<String>,
    pub confidence: f64,
    /// Vote behind the selection; absent for the fast strategy.
    pub vote: Option<VoteOutcome>,
    /// Every version that contributed, including a hedged confirmation if one was folded in.
    pub versions: Vec<VersionResult>,
    pub redundancy_level: usize,
    pub confirmed: bool,
}

impl RedundancyOutcome {
    fn voted(strategy: Strategy, vote: VoteOutcome, versions: Vec<VersionResult>) -> Self {
        Self {
            strategy,
            content: vote.consensus.clone(),
            confidence: vote.confidence,
            vote: Some(vote),
            redundancy_level: versions.len(),
            versions,
            confirmed: false,
        }
    }
}

fn breaker_key(provider: &dyn Provider) -> String {
    format!("provider_{}", provider.name())
}

/// Routes every call of the wrapped provider through its `provider_<name>` breaker. Responses
/// with invalid confidence count as failures.
struct BreakerGuarded {
    inner: Arc<dyn Provider>,
    breakers: Arc<CircuitBreakerManager>,
    config: CircuitBreakerConfig,
    key: String,
}

#[async_trait]
impl Provider for BreakerGuarded {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn execute(
        &self,
        task: &Task,
        params: &ExecutionParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.breakers
            .execute_with_config(&self.key, &self.config, move || async move {
                self.inner.execute(task, params).await.and_then(ProviderResponse::validate)
            })
            .await
            .map_err(|error| match error {
                BreakerError::Open { name } => {
                    ProviderError::Failed(format!("circuit breaker {name} is open"))
                }
                BreakerError::ExecutionFailed { source, .. } => source,
            })
    }
}

/// Composes the redundancy patterns behind one entry point.
///
/// Provider breakers live in the shared [`CircuitBreakerManager`] under `provider_<name>`, so
/// their state is visible next to validator breakers in `get_all_states()`.
pub struct RedundancyOrchestrator {
    config: RedundancyConfig,
    breakers: Arc<CircuitBreakerManager>,
    hedge: HedgeExecutor,
    n_version: NVersionExecutor,
}

impl RedundancyOrchestrator {
    #[must_use]
    pub fn new(config: RedundancyConfig, breakers: Arc<CircuitBreakerManager>) -> Self {
        Self {
            hedge: HedgeExecutor::new(&config),
            n_version: NVersionExecutor::new(config.min_versions),
            config,
            breakers,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RedundancyConfig {
        &self.config
    }

    #[must_use]
    pub fn hedge_executor(&self) -> &HedgeExecutor {
        &self.hedge
    }

    #[must_use]
    pub fn breakers(&self) -> &Arc<CircuitBreakerManager> {
        &self.breakers
    }

    /// Executes `task` under `strategy`.
    ///
    /// # Errors
    ///
    /// - [`RedundancyError::NoProviders`] when `providers` is empty
    /// - [`RedundancyError::AllProvidersFailed`] when every hedged call of a fast run fails
    /// - [`RedundancyError::NoValidResults`] when a full run produces no version
    pub async fn execute_with_redundancy(
        &self,
        providers: &[Arc<dyn Provider>],
        task: &Task,
        strategy: Strategy,
    ) -> Result<RedundancyOutcome, RedundancyError> {
        if providers.is_empty() {
            crate::metrics::record_redundancy_run(strategy.as_str(), false, 0);
            return Err(RedundancyError::NoProviders);
        }

        debug!(strategy = %strategy, providers = providers.len(), "executing with redundancy");

        let outcome = match strategy {
            Strategy::Fast => self.execute_fast(providers, task).await,
            Strategy::Reliable => Ok(self.execute_reliable(providers, task).await),
            Strategy::Full => self.execute_full(providers, task).await,
        };

        match &outcome {
            Ok(result) => {
                crate::metrics::record_redundancy_run(
                    strategy.as_str(),
                    true,
                    result.redundancy_level,
                );
                info!(
                    strategy = %strategy,
                    confidence = result.confidence,
                    redundancy_level = result.redundancy_level,
                    confirmed = result.confirmed,
                    "redundant execution finished"
                );
            }
            Err(error) => {
                crate::metrics::record_redundancy_run(strategy.as_str(), false, 0);
                warn!(strategy = %strategy, error = %error, "redundant execution failed");
            }
        }
        outcome
    }

    async fn execute_fast(
        &self,
        providers: &[Arc<dyn Provider>],
        task: &Task,
    ) -> Result<RedundancyOutcome, RedundancyError> {
        let won = self.hedge.hedged_call(providers, task).await?;
        let version = VersionResult::from_response(won.response, &won.provider, won.hedge_index);

        Ok(RedundancyOutcome {
            strategy: Strategy::Fast,
            content: Some(version.content.clone()),
            confidence: version.confidence,
            vote: None,
            versions: vec![version],
            redundancy_level: 1,
            confirmed: false,
        })
    }

    async fn execute_reliable(
        &self,
        providers: &[Arc<dyn Provider>],
        task: &Task,
    ) -> RedundancyOutcome {
        let versions = self.n_version.execute_n_versions(providers, task).await;
        let vote = MajorityVoteAggregator::aggregate(&versions, self.config.vote_confidence_threshold);
        RedundancyOutcome::voted(Strategy::Reliable, vote, versions)
    }

    async fn execute_full(
        &self,
        providers: &[Arc<dyn Provider>],
        task: &Task,
    ) -> Result<RedundancyOutcome, RedundancyError> {
        let selected = &providers[..providers.len().min(self.config.full_max_providers)];

        let calls = selected.iter().enumerate().map(|(version, provider)| async move {
            let key = breaker_key(provider.as_ref());
            let params = ExecutionParams::for_version(version);
            let outcome = self
                .breakers
                .execute_with_config(&key, &self.config.breaker, move || async move {
                    provider.execute(task, &params).await.and_then(ProviderResponse::validate)
                })
                .await;
            (version, provider, outcome)
        });

        let mut versions = Vec::with_capacity(selected.len());
        let mut contributors: HashSet<&str> = HashSet::new();

        for (version, provider, outcome) in join_all(calls).await {
            match outcome {
                Ok(response) => {
                    contributors.insert(provider.name());
                    versions.push(VersionResult::from_response(response, provider.name(), version));
                }
                Err(BreakerError::Open { name }) => {
                    warn!(provider = provider.name(), breaker = %name, "provider blocked by open breaker");
                }
                Err(error) => {
                    warn!(provider = provider.name(), error = %error, "provider version failed");
                }
            }
        }

        if versions.is_empty() {
            return Err(RedundancyError::NoValidResults { attempted: selected.len() });
        }

        let threshold = self.config.vote_confidence_threshold;
        let vote = MajorityVoteAggregator::aggregate(&versions, threshold);

        if vote.confidence >= self.config.confirmation_threshold {
            return Ok(RedundancyOutcome::voted(Strategy::Full, vote, versions));
        }

        let independent = self.confirmation_candidates(providers, &contributors).await;

        if independent.is_empty() {
            debug!(confidence = vote.confidence, "weak vote but no independent providers to confirm");
            return Ok(RedundancyOutcome::voted(Strategy::Full, vote, versions));
        }

        debug!(
            confidence = vote.confidence,
            candidates = independent.len(),
            "weak vote, requesting hedged confirmation"
        );

        match self.hedge.hedged_call(&independent, task).await {
            Ok(confirmation) => {
                let boosted =
                    (confirmation.response.confidence * self.config.confirmation_boost).min(1.0);
                versions.push(VersionResult {
                    content: confirmation.response.content,
                    confidence: boosted,
                    provider: HEDGED_CONFIRMATION_ID.to_string(),
                    version: versions.len(),
                });

                let revote = MajorityVoteAggregator::aggregate(&versions, threshold);
                let mut outcome = RedundancyOutcome::voted(Strategy::Full, revote, versions);
                outcome.confirmed = true;
                Ok(outcome)
            }
            Err(error) => {
                warn!(error = %error, "hedged confirmation failed");
                Ok(RedundancyOutcome::voted(Strategy::Full, vote, versions))
            }
        }
    }

    /// Providers that did not contribute a version and whose breaker currently admits calls,
    /// each wrapped so the confirmation call records its outcome on that breaker.
    async fn confirmation_candidates(
        &self,
        providers: &[Arc<dyn Provider>],
        contributors: &HashSet<&str>,
    ) -> Vec<Arc<dyn Provider>> {
        let mut candidates: Vec<Arc<dyn Provider>> = Vec::new();
        for provider in providers {
            if contributors.contains(provider.name()) {
                continue;
            }
            let key = breaker_key(provider.as_ref());
            let breaker = self.breakers.get_breaker_with_config(&key, &self.config.breaker);
            if !breaker.can_execute().await {
                debug!(provider = provider.name(), "skipping confirmation from blocked provider");
                continue;
            }
            candidates.push(Arc::new(BreakerGuarded {
                inner: Arc::clone(provider),
                breakers: Arc::clone(&self.breakers),
                config: self.config.breaker.clone(),
                key,
            }));
        }
        candidates
    }
}
