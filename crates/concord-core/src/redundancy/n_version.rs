//! N-version execution: the same task on every provider with diversified parameters.

use super::provider::{ExecutionParams, Provider, ProviderResponse, Task};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// One successful version of a redundant run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionResult {
    pub content: String,
    pub confidence: f64,
    pub provider: String,
    pub version: usize,
}

impl VersionResult {
    #[must_use]
    pub fn from_response(response: ProviderResponse, provider: &str, version: usize) -> Self {
        Self {
            content: response.content,
            confidence: response.confidence,
            provider: provider.to_string(),
            version,
        }
    }
}

pub struct NVersionExecutor {
    min_versions: usize,
}

impl NVersionExecutor {
    #[must_use]
    pub fn new(min_versions: usize) -> Self {
        Self { min_versions }
    }

    #[must_use]
    pub fn min_versions(&self) -> usize {
        self.min_versions
    }

    /// Runs every provider concurrently, the `i`-th with [`ExecutionParams::for_version`]`(i)`,
    /// and keeps the successful versions in provider order. A response whose confidence fails
    /// [`ProviderResponse::validate`] counts as a failed version.
    pub async fn execute_n_versions(
        &self,
        providers: &[Arc<dyn Provider>],
        task: &Task,
    ) -> Vec<VersionResult> {
        if providers.len() < self.min_versions {
            warn!(
                available = providers.len(),
                min_versions = self.min_versions,
                "fewer providers than required versions"
            );
        }

        let calls = providers.iter().enumerate().map(|(version, provider)| async move {
            let params = ExecutionParams::for_version(version);
            let outcome = provider.execute(task, &params).await.and_then(ProviderResponse::validate);
            (version, provider.name(), outcome)
        });

        let mut versions = Vec::with_capacity(providers.len());
        for (version, provider, outcome) in join_all(calls).await {
            match outcome {
                Ok(response) => {
                    debug!(provider, version, confidence = response.confidence, "version succeeded");
                    versions.push(VersionResult::from_response(response, provider, version));
                }
                Err(error) => {
                    warn!(provider, version, error = %error, "version failed");
                }
            }
        }

        if versions.len() < self.min_versions {
            warn!(
                succeeded = versions.len(),
                min_versions = self.min_versions,
                "fewer versions succeeded than required"
            );
        }
        versions
    }
}
