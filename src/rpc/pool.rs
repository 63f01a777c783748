//! Per-chain endpoint pools with health-checked failover
//!
//! Each chain holds an ordered list of endpoints: index 0 is the primary,
//! the rest are backups. Mutations go through the shared [`Store`] and are
//! flushed to disk best-effort after every change; the in-memory pool stays
//! authoritative even when a flush fails.

use crate::config::{Settings, Store};
use crate::error::{Result, RpcError};
use crate::rpc::{HealthCheck, HealthReport};
use crate::validate;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Endpoint pool registry and failover selector
pub struct RpcPools {
    store: Arc<Store>,
    checker: Arc<dyn HealthCheck>,
    max_pool_size: usize,
    verify_timeout: Duration,
    probe_timeout: Duration,
}

impl RpcPools {
    pub fn new(store: Arc<Store>, checker: Arc<dyn HealthCheck>, settings: &Settings) -> Self {
        Self {
            store,
            checker,
            max_pool_size: settings.max_pool_size(),
            verify_timeout: settings.verify_timeout,
            probe_timeout: settings.probe_timeout,
        }
    }

    /// Set the primary endpoint for a chain.
    ///
    /// The endpoint must pass a thorough probe first. An existing occurrence
    /// anywhere in the pool moves to the front instead of duplicating; the
    /// previous primary becomes the first backup.
    pub async fn set_primary(&self, chain_id: u64, url: &str) -> Result<()> {
        validate::chain_id(chain_id)?;
        validate::rpc_url(url)?;

        let report = self.checker.check(url, chain_id, self.verify_timeout).await;
        if !report.healthy {
            return Err(RpcError::EndpointUnreachable {
                url: validate::mask_url(url),
                reason: report.error,
            }
            .into());
        }

        let max = self.max_pool_size;
        self.store.mutate(|s| {
            let pool = s.pools.entry(chain_id).or_default();
            pool.retain(|u| u != url);
            pool.insert(0, url.to_string());
            pool.truncate(max);
        });
        self.persist();

        tracing::info!("primary for chain {} set to {}", chain_id, validate::mask_url(url));
        Ok(())
    }

    /// Append a backup endpoint for a chain.
    ///
    /// Requires an existing pool and a passing probe. When the pool is full
    /// the tail backup is evicted; the primary is never touched.
    pub async fn add_backup(&self, chain_id: u64, url: &str) -> Result<()> {
        validate::chain_id(chain_id)?;
        validate::rpc_url(url)?;

        let pool = self.store.read(|s| s.pools.get(&chain_id).cloned());
        let pool = pool.ok_or(RpcError::NoPrimary { chain_id })?;
        if pool.iter().any(|u| u == url) {
            return Err(RpcError::DuplicateEndpoint {
                chain_id,
                url: validate::mask_url(url),
            }
            .into());
        }

        let report = self.checker.check(url, chain_id, self.verify_timeout).await;
        if !report.healthy {
            return Err(RpcError::EndpointUnreachable {
                url: validate::mask_url(url),
                reason: report.error,
            }
            .into());
        }

        let max = self.max_pool_size;
        let added = self.store.mutate(|s| {
            let pool = match s.pools.get_mut(&chain_id) {
                Some(p) => p,
                None => return Err(RpcError::NoPrimary { chain_id }),
            };
            // Re-check under the lock; another task may have added it while
            // we were probing
            if pool.iter().any(|u| u == url) {
                return Err(RpcError::DuplicateEndpoint {
                    chain_id,
                    url: validate::mask_url(url),
                });
            }
            if pool.len() >= max {
                // Evict the tail backup to make room; a capacity-1 pool has
                // only the primary, which is never evicted
                if pool.len() > 1 {
                    pool.pop();
                } else {
                    return Err(RpcError::PoolFull {
                        chain_id,
                        capacity: max,
                    });
                }
            }
            pool.push(url.to_string());
            Ok(())
        });
        added?;
        self.persist();

        tracing::info!("backup for chain {} added: {}", chain_id, validate::mask_url(url));
        Ok(())
    }

    /// Cyclic left shift: the primary moves to the tail, the first backup
    /// becomes primary. No probe; this is a manual override.
    pub fn rotate(&self, chain_id: u64) -> Result<String> {
        validate::chain_id(chain_id)?;

        let rotated = self.store.mutate(|s| {
            let pool = match s.pools.get_mut(&chain_id) {
                Some(p) => p,
                None => return Err(RpcError::NotConfigured { chain_id }),
            };
            if pool.len() < 2 {
                return Err(RpcError::NoBackupAvailable { chain_id });
            }
            pool.rotate_left(1);
            Ok(pool[0].clone())
        });
        let new_primary = rotated?;
        self.persist();
        Ok(new_primary)
    }

    /// Delete a chain's pool entirely
    pub fn remove(&self, chain_id: u64) -> Result<()> {
        validate::chain_id(chain_id)?;

        let removed = self.store.mutate(|s| s.pools.remove(&chain_id).is_some());
        if !removed {
            return Err(RpcError::NotConfigured { chain_id }.into());
        }
        self.persist();
        Ok(())
    }

    /// Ordered snapshot of every pool; never mutates
    pub fn list(&self) -> BTreeMap<u64, Vec<String>> {
        self.store.read(|s| s.pools.clone())
    }

    /// Snapshot of one chain's pool
    pub fn pool(&self, chain_id: u64) -> Option<Vec<String>> {
        self.store.read(|s| s.pools.get(&chain_id).cloned())
    }

    /// Walk the pool in order and return the first healthy endpoint.
    ///
    /// A healthy backup is promoted to primary without a second probe and
    /// the new order is persisted. Short-circuits on the first success; if
    /// every entry fails, the error names up to 3 failed endpoints.
    pub async fn resolve(&self, chain_id: u64) -> Result<String> {
        validate::chain_id(chain_id)?;

        let snapshot = self
            .store
            .read(|s| s.pools.get(&chain_id).cloned())
            .unwrap_or_default();
        if snapshot.is_empty() {
            return Err(RpcError::NoConfiguration { chain_id }.into());
        }

        let mut visited = HashSet::new();
        let mut failed = Vec::new();

        for (index, url) in snapshot.iter().enumerate() {
            if !visited.insert(url.clone()) {
                continue;
            }

            let report = self.checker.check(url, chain_id, self.probe_timeout).await;
            if !report.healthy {
                tracing::debug!(
                    "probe failed for {} (chain {}): {}",
                    validate::mask_url(url),
                    chain_id,
                    report.error
                );
                failed.push(url.clone());
                continue;
            }

            if index > 0 {
                self.promote(chain_id, url);
                self.persist();
            }
            return Ok(url.clone());
        }

        let extra = failed.len().saturating_sub(3);
        Err(RpcError::AllEndpointsFailed {
            chain_id,
            failed: failed
                .iter()
                .take(3)
                .map(|u| validate::mask_url(u))
                .collect(),
            extra,
        }
        .into())
    }

    /// Probe every endpoint in a chain's pool, in order, for display
    pub async fn health(&self, chain_id: u64) -> Result<Vec<(String, HealthReport)>> {
        validate::chain_id(chain_id)?;

        let snapshot = self
            .store
            .read(|s| s.pools.get(&chain_id).cloned())
            .ok_or(RpcError::NoConfiguration { chain_id })?;

        let mut reports = Vec::with_capacity(snapshot.len());
        for url in snapshot {
            let report = self.checker.check(&url, chain_id, self.probe_timeout).await;
            reports.push((url, report));
        }
        Ok(reports)
    }

    /// Move a known-healthy endpoint to the front of its pool.
    ///
    /// The pool is re-read under the write lock: the probe ran against a
    /// lock-free snapshot and a concurrent resolution may have reordered or
    /// removed entries in the meantime.
    fn promote(&self, chain_id: u64, url: &str) {
        self.store.mutate(|s| {
            let Some(pool) = s.pools.get_mut(&chain_id) else {
                return;
            };
            let Some(position) = pool.iter().position(|u| u == url) else {
                return;
            };
            if position == 0 {
                return;
            }
            let demoted = pool[0].clone();
            let promoted = pool.remove(position);
            pool.insert(0, promoted);
            tracing::warn!(
                "failover on chain {}: demoted {} in favor of {}",
                chain_id,
                validate::mask_url(&demoted),
                validate::mask_url(url)
            );
        });
    }

    fn persist(&self) {
        if let Err(e) = self.store.flush() {
            tracing::warn!("failed to persist state: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Scripted checker: healthy iff the URL is in the allow set; records
    /// every probe
    struct StubChecker {
        healthy: HashSet<String>,
        probes: Mutex<Vec<String>>,
    }

    impl StubChecker {
        fn new(healthy: &[&str]) -> Self {
            Self {
                healthy: healthy.iter().map(|u| u.to_string()).collect(),
                probes: Mutex::new(Vec::new()),
            }
        }

        fn probe_count(&self) -> usize {
            self.probes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HealthCheck for StubChecker {
        async fn check(&self, url: &str, _chain: u64, _timeout: Duration) -> HealthReport {
            self.probes.lock().unwrap().push(url.to_string());
            if self.healthy.contains(url) {
                HealthReport::healthy(1, 10)
            } else {
                HealthReport::unreachable("not connected")
            }
        }
    }

    /// Checker that reports a different chain id than expected
    struct WrongChainChecker;

    #[async_trait]
    impl HealthCheck for WrongChainChecker {
        async fn check(&self, _url: &str, expected: u64, _timeout: Duration) -> HealthReport {
            HealthReport::wrong_chain(expected, expected + 1)
        }
    }

    fn pools_with(checker: Arc<dyn HealthCheck>) -> (RpcPools, Arc<Store>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("state.json"), None).unwrap());
        let settings = Settings::default();
        (
            RpcPools::new(store.clone(), checker, &settings),
            store,
            dir,
        )
    }

    fn seed(store: &Store, chain_id: u64, urls: &[&str]) {
        store.mutate(|s| {
            s.pools
                .insert(chain_id, urls.iter().map(|u| u.to_string()).collect());
        });
    }

    #[tokio::test]
    async fn test_resolve_no_configuration() {
        let (pools, _store, _dir) = pools_with(Arc::new(StubChecker::new(&[])));
        let err = pools.resolve(1).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Rpc(RpcError::NoConfiguration { chain_id: 1 })
        ));
    }

    #[tokio::test]
    async fn test_resolve_healthy_primary_short_circuits() {
        let checker = Arc::new(StubChecker::new(&["http://primary.com"]));
        let (pools, store, _dir) = pools_with(checker.clone());
        seed(&store, 1, &["http://primary.com", "http://backup.com"]);

        let url = pools.resolve(1).await.unwrap();
        assert_eq!(url, "http://primary.com");
        // Backup never probed
        assert_eq!(checker.probe_count(), 1);
        // Order unchanged
        assert_eq!(
            pools.pool(1).unwrap(),
            vec!["http://primary.com", "http://backup.com"]
        );
    }

    #[tokio::test]
    async fn test_resolve_failover_promotes_backup() {
        let checker = Arc::new(StubChecker::new(&["http://good-b.com"]));
        let (pools, store, _dir) = pools_with(checker);
        seed(&store, 1, &["http://dead-a.com", "http://good-b.com"]);

        let url = pools.resolve(1).await.unwrap();
        assert_eq!(url, "http://good-b.com");
        assert_eq!(
            pools.pool(1).unwrap(),
            vec!["http://good-b.com", "http://dead-a.com"]
        );
    }

    #[tokio::test]
    async fn test_resolve_single_candidate_healthy_at_exactly_one_index() {
        let checker = Arc::new(StubChecker::new(&["http://c.com"]));
        let (pools, store, _dir) = pools_with(checker);
        seed(&store, 1, &["http://a.com", "http://b.com", "http://c.com"]);

        let url = pools.resolve(1).await.unwrap();
        assert_eq!(url, "http://c.com");
        assert_eq!(pools.pool(1).unwrap()[0], "http://c.com");
    }

    #[tokio::test]
    async fn test_resolve_all_failed_names_endpoints() {
        let (pools, store, _dir) = pools_with(Arc::new(StubChecker::new(&[])));
        seed(&store, 1, &["http://a.com"]);

        let err = pools.resolve(1).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("all endpoints failed for chain 1"));
        assert!(message.contains("a.com"));
    }

    #[tokio::test]
    async fn test_resolve_all_failed_truncates_to_three() {
        let (pools, store, _dir) = pools_with(Arc::new(StubChecker::new(&[])));
        seed(
            &store,
            1,
            &[
                "http://e1.com",
                "http://e2.com",
                "http://e3.com",
                "http://e4.com",
                "http://e5.com",
            ],
        );

        let err = pools.resolve(1).await.unwrap_err();
        match err {
            crate::error::Error::Rpc(RpcError::AllEndpointsFailed { ref failed, extra, .. }) => {
                assert_eq!(failed.len(), 3);
                assert_eq!(extra, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("+2 more"));
    }

    #[tokio::test]
    async fn test_resolve_probes_duplicates_once() {
        let checker = Arc::new(StubChecker::new(&[]));
        let (pools, store, _dir) = pools_with(checker.clone());
        // Duplicates can exist in legacy state files
        seed(&store, 1, &["http://a.com", "http://a.com", "http://b.com"]);

        let _ = pools.resolve(1).await.unwrap_err();
        assert_eq!(checker.probe_count(), 2);
    }

    #[tokio::test]
    async fn test_set_primary_prepends_and_demotes() {
        let checker = Arc::new(StubChecker::new(&["http://new.com"]));
        let (pools, store, _dir) = pools_with(checker);
        seed(&store, 1, &["http://old1.com", "http://old2.com"]);

        pools.set_primary(1, "http://new.com").await.unwrap();
        assert_eq!(
            pools.pool(1).unwrap(),
            vec!["http://new.com", "http://old1.com", "http://old2.com"]
        );
    }

    #[tokio::test]
    async fn test_set_primary_unreachable() {
        let (pools, _store, _dir) = pools_with(Arc::new(StubChecker::new(&[])));
        let err = pools.set_primary(1, "http://dead.com").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Rpc(RpcError::EndpointUnreachable { .. })
        ));
        assert!(pools.pool(1).is_none());
    }

    #[tokio::test]
    async fn test_set_primary_wrong_chain_rejected() {
        let (pools, _store, _dir) = pools_with(Arc::new(WrongChainChecker));
        let err = pools.set_primary(1, "http://other.com").await.unwrap_err();
        assert!(err.to_string().contains("wrong chain id"));
    }

    #[tokio::test]
    async fn test_set_primary_moves_existing_entry_to_front() {
        let checker = Arc::new(StubChecker::new(&["http://b.com"]));
        let (pools, store, _dir) = pools_with(checker);
        seed(&store, 1, &["http://a.com", "http://b.com"]);

        pools.set_primary(1, "http://b.com").await.unwrap();
        assert_eq!(pools.pool(1).unwrap(), vec!["http://b.com", "http://a.com"]);
    }

    #[tokio::test]
    async fn test_set_primary_truncates_to_capacity() {
        let checker = Arc::new(StubChecker::new(&["http://new.com"]));
        let (pools, store, _dir) = pools_with(checker);
        // Already at capacity (max_backups 3 -> 4 entries)
        seed(
            &store,
            1,
            &["http://a.com", "http://b.com", "http://c.com", "http://d.com"],
        );

        pools.set_primary(1, "http://new.com").await.unwrap();
        let pool = pools.pool(1).unwrap();
        assert_eq!(pool.len(), 4);
        assert_eq!(pool[0], "http://new.com");
        assert!(!pool.contains(&"http://d.com".to_string()));
    }

    #[tokio::test]
    async fn test_add_backup_requires_primary() {
        let (pools, _store, _dir) = pools_with(Arc::new(StubChecker::new(&["http://b.com"])));
        let err = pools.add_backup(1, "http://b.com").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Rpc(RpcError::NoPrimary { chain_id: 1 })
        ));
    }

    #[tokio::test]
    async fn test_add_backup_rejects_duplicate() {
        let checker = Arc::new(StubChecker::new(&["http://x.com"]));
        let (pools, store, _dir) = pools_with(checker.clone());
        seed(&store, 1, &["http://x.com"]);

        let err = pools.add_backup(1, "http://x.com").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Rpc(RpcError::DuplicateEndpoint { chain_id: 1, .. })
        ));
        // Rejected before any probe, pool unchanged
        assert_eq!(checker.probe_count(), 0);
        assert_eq!(pools.pool(1).unwrap(), vec!["http://x.com"]);
    }

    #[tokio::test]
    async fn test_add_backup_appends() {
        let checker = Arc::new(StubChecker::new(&["http://backup.com"]));
        let (pools, store, _dir) = pools_with(checker);
        seed(&store, 1, &["http://primary.com"]);

        pools.add_backup(1, "http://backup.com").await.unwrap();
        assert_eq!(
            pools.pool(1).unwrap(),
            vec!["http://primary.com", "http://backup.com"]
        );
    }

    #[tokio::test]
    async fn test_add_backup_evicts_tail_never_primary() {
        let checker = Arc::new(StubChecker::new(&["http://b4.com"]));
        let (pools, store, _dir) = pools_with(checker);
        seed(
            &store,
            1,
            &["http://p.com", "http://b1.com", "http://b2.com", "http://b3.com"],
        );

        pools.add_backup(1, "http://b4.com").await.unwrap();
        let pool = pools.pool(1).unwrap();
        assert_eq!(pool.len(), 4);
        assert_eq!(pool[0], "http://p.com");
        assert_eq!(pool[3], "http://b4.com");
        assert!(!pool.contains(&"http://b3.com".to_string()));
    }

    #[tokio::test]
    async fn test_add_backup_rejected_when_backups_disabled() {
        let checker = Arc::new(StubChecker::new(&["http://b.com"]));
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("state.json"), None).unwrap());
        let settings = Settings {
            max_backups: 0,
            ..Settings::default()
        };
        let pools = RpcPools::new(store.clone(), checker, &settings);
        seed(&store, 1, &["http://p.com"]);

        let err = pools.add_backup(1, "http://b.com").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Rpc(RpcError::PoolFull {
                chain_id: 1,
                capacity: 1
            })
        ));
        // Pool never grows past its capacity
        assert_eq!(pools.pool(1).unwrap(), vec!["http://p.com"]);
    }

    #[tokio::test]
    async fn test_rotate_is_cyclic() {
        let (pools, store, _dir) = pools_with(Arc::new(StubChecker::new(&[])));
        let original = vec!["http://p.com", "http://b1.com", "http://b2.com"];
        seed(&store, 1, &original);

        assert_eq!(pools.rotate(1).unwrap(), "http://b1.com");
        assert_eq!(pools.rotate(1).unwrap(), "http://b2.com");
        assert_eq!(pools.rotate(1).unwrap(), "http://p.com");
        // N rotations restore the original order
        assert_eq!(pools.pool(1).unwrap(), original);
    }

    #[tokio::test]
    async fn test_rotate_needs_backup() {
        let (pools, store, _dir) = pools_with(Arc::new(StubChecker::new(&[])));
        seed(&store, 1, &["http://only.com"]);

        let err = pools.rotate(1).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Rpc(RpcError::NoBackupAvailable { chain_id: 1 })
        ));
    }

    #[tokio::test]
    async fn test_rotate_not_configured() {
        let (pools, _store, _dir) = pools_with(Arc::new(StubChecker::new(&[])));
        let err = pools.rotate(1).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Rpc(RpcError::NotConfigured { chain_id: 1 })
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let (pools, store, _dir) = pools_with(Arc::new(StubChecker::new(&[])));
        seed(&store, 1, &["http://a.com"]);

        pools.remove(1).unwrap();
        assert!(pools.pool(1).is_none());
        assert!(pools.remove(1).is_err());
    }

    #[tokio::test]
    async fn test_invalid_chain_id_rejected_before_probe() {
        let checker = Arc::new(StubChecker::new(&["http://a.com"]));
        let (pools, _store, _dir) = pools_with(checker.clone());

        assert!(pools.set_primary(0, "http://a.com").await.is_err());
        assert_eq!(checker.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_health_reports_every_entry_in_order() {
        let checker = Arc::new(StubChecker::new(&["http://up.com"]));
        let (pools, store, _dir) = pools_with(checker);
        seed(&store, 1, &["http://up.com", "http://down.com"]);

        let reports = pools.health(1).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].0, "http://up.com");
        assert!(reports[0].1.healthy);
        assert!(!reports[1].1.healthy);
    }

    #[tokio::test]
    async fn test_failover_order_survives_reload() {
        let checker = Arc::new(StubChecker::new(&["http://good-b.com"]));
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = Arc::new(Store::open(&path, None).unwrap());
        let settings = Settings::default();
        let pools = RpcPools::new(store.clone(), checker, &settings);
        seed(&store, 1, &["http://dead-a.com", "http://good-b.com"]);

        pools.resolve(1).await.unwrap();

        let reloaded = Store::open(&path, None).unwrap();
        assert_eq!(
            reloaded.read(|s| s.pools.get(&1).cloned()).unwrap(),
            vec!["http://good-b.com", "http://dead-a.com"]
        );
    }
}
