//! Endpoint health probing
//!
//! A probe answers three questions in order: does the endpoint respond at
//! all, is it serving the expected chain, and can it actually read state
//! (many broken gateways answer trivial RPCs but fail `eth_getBalance`).
//! The checker is a boundary: it never returns an error, only a report.

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Outcome of a single endpoint probe
#[derive(Debug, Clone, Default)]
pub struct HealthReport {
    pub healthy: bool,
    /// Chain id reported by the endpoint, when it got that far
    pub chain_id: Option<u64>,
    /// Wall-clock probe latency; only meaningful on success
    pub latency_ms: u64,
    pub error: String,
}

impl HealthReport {
    pub fn healthy(chain_id: u64, latency_ms: u64) -> Self {
        Self {
            healthy: true,
            chain_id: Some(chain_id),
            latency_ms,
            error: String::new(),
        }
    }

    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            chain_id: None,
            latency_ms: 0,
            error: error.into(),
        }
    }

    pub fn wrong_chain(expected: u64, actual: u64) -> Self {
        Self {
            healthy: false,
            chain_id: Some(actual),
            latency_ms: 0,
            error: format!("wrong chain id (expected {}, got {})", expected, actual),
        }
    }
}

/// Probe seam: the pool, selector, and discovery prober all go through this
/// so tests can substitute scripted outcomes.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Probe one endpoint against an expected chain id. Never errors.
    async fn check(&self, url: &str, expected_chain_id: u64, timeout: Duration) -> HealthReport;
}

/// Real checker backed by an alloy HTTP provider
#[derive(Debug, Clone, Default)]
pub struct RpcHealthChecker;

impl RpcHealthChecker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HealthCheck for RpcHealthChecker {
    async fn check(&self, url: &str, expected_chain_id: u64, timeout: Duration) -> HealthReport {
        let started = Instant::now();

        let parsed = match url.parse() {
            Ok(u) => u,
            Err(_) => return HealthReport::unreachable("not connected"),
        };
        let provider = ProviderBuilder::new().on_http(parsed);

        // Liveness
        match tokio::time::timeout(timeout, provider.get_block_number()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::debug!("liveness probe failed for {}: {}", url, e);
                return HealthReport::unreachable("not connected");
            }
            Err(_) => return HealthReport::unreachable("not connected"),
        }

        // Chain identity
        let chain_id = match tokio::time::timeout(timeout, provider.get_chain_id()).await {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => return HealthReport::unreachable(format!("chain id read failed: {}", e)),
            Err(_) => return HealthReport::unreachable("not connected"),
        };
        if chain_id != expected_chain_id {
            return HealthReport::wrong_chain(expected_chain_id, chain_id);
        }

        // State read: balance of the zero address proves the node serves
        // state, not just trivial RPCs
        match tokio::time::timeout(timeout, provider.get_balance(Address::ZERO)).await {
            Ok(Ok(_)) => {
                HealthReport::healthy(chain_id, started.elapsed().as_millis() as u64)
            }
            Ok(Err(e)) => HealthReport::unreachable(format!("state read failed: {}", e)),
            Err(_) => HealthReport::unreachable("state read timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unparseable_url_fails_without_network() {
        let checker = RpcHealthChecker::new();
        let report = checker
            .check("not a url", 1, Duration::from_secs(1))
            .await;

        assert!(!report.healthy);
        assert_eq!(report.chain_id, None);
        assert_eq!(report.error, "not connected");
    }

    #[test]
    fn test_wrong_chain_report() {
        let report = HealthReport::wrong_chain(1, 137);
        assert!(!report.healthy);
        assert_eq!(report.chain_id, Some(137));
        assert!(report.error.contains("expected 1"));
        assert!(report.error.contains("got 137"));
    }

    #[test]
    fn test_healthy_report() {
        let report = HealthReport::healthy(1, 42);
        assert!(report.healthy);
        assert_eq!(report.chain_id, Some(1));
        assert_eq!(report.latency_ms, 42);
        assert!(report.error.is_empty());
    }
}
