//! Endpoint discovery
//!
//! Pulls candidate RPC URLs for a chain from the public registry, filters
//! out unusable entries, and probes a bounded, shuffled sample concurrently.
//! Results come back in completion order so the fastest responders lead.

use crate::error::{RegistryError, Result};
use crate::registry::ChainRegistry;
use crate::rpc::{HealthCheck, HealthReport};
use crate::validate;
use futures::stream::{self, StreamExt};
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;

/// A candidate endpoint that passed a discovery probe
#[derive(Debug, Clone)]
pub struct DiscoveredEndpoint {
    pub url: String,
    pub latency_ms: u64,
}

/// Probes registry candidates to find working public endpoints
pub struct Discovery {
    registry: Arc<ChainRegistry>,
    checker: Arc<dyn HealthCheck>,
    max_candidates: usize,
    concurrency: usize,
    probe_timeout: Duration,
}

impl Discovery {
    pub fn new(
        registry: Arc<ChainRegistry>,
        checker: Arc<dyn HealthCheck>,
        settings: &crate::config::Settings,
    ) -> Self {
        Self {
            registry,
            checker,
            max_candidates: settings.max_candidates,
            concurrency: settings.discovery_concurrency,
            probe_timeout: settings.discovery_timeout,
        }
    }

    /// Find healthy public endpoints for a chain.
    ///
    /// Candidates are shuffled before sampling so repeated runs spread load
    /// across the registry's list. Templated URLs (`${API_KEY}` style) and
    /// non-HTTP transports are skipped.
    pub async fn discover(&self, chain_id: u64) -> Result<Vec<DiscoveredEndpoint>> {
        validate::chain_id(chain_id)?;

        let records = self.registry.chain(chain_id).await?;
        let mut candidates: Vec<String> = records
            .into_iter()
            .flat_map(|r| r.rpc)
            .filter(|u| Self::usable(u))
            .collect();
        candidates.shuffle(&mut rand::thread_rng());
        candidates.truncate(self.max_candidates);

        if candidates.is_empty() {
            return Err(RegistryError::NoCandidates { chain_id }.into());
        }

        let probed = candidates.len();
        tracing::info!("probing {} candidate endpoints for chain {}", probed, chain_id);

        let checker = self.checker.clone();
        let timeout = self.probe_timeout;
        let reports: Vec<(String, HealthReport)> = stream::iter(candidates)
            .map(|url| {
                let checker = checker.clone();
                async move {
                    let report = checker.check(&url, chain_id, timeout).await;
                    (url, report)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let healthy: Vec<DiscoveredEndpoint> = reports
            .into_iter()
            .filter(|(_, r)| r.healthy)
            .map(|(url, r)| DiscoveredEndpoint {
                url,
                latency_ms: r.latency_ms,
            })
            .collect();

        if healthy.is_empty() {
            return Err(RegistryError::NoReliableEndpoints { chain_id, probed }.into());
        }
        Ok(healthy)
    }

    /// Plain HTTP(S) URLs only; templated entries need credentials we
    /// don't have
    fn usable(url: &str) -> bool {
        (url.starts_with("http://") || url.starts_with("https://")) && !url.contains("${")
    }
}
