//! Public chain registry client
//!
//! Fetches the community chain list (chainid.network format) and caches it
//! on disk so repeated discovery runs don't hammer the registry. The cache
//! has a freshness window; an expired cache is refetched, and a fetch
//! failure is an error rather than silently serving stale data.

mod discover;

pub use discover::{DiscoveredEndpoint, Discovery};

use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// One chain entry from the registry; unknown fields are ignored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainRecord {
    #[serde(rename = "chainId", default)]
    pub chain_id: u64,
    #[serde(default)]
    pub rpc: Vec<String>,
}

/// Registry fetch seam; tests substitute a scripted source
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<ChainRecord>>;
}

/// Fetches the chain list over HTTP
pub struct HttpRegistrySource {
    http: reqwest::Client,
    url: String,
}

impl HttpRegistrySource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl RegistrySource for HttpRegistrySource {
    async fn fetch(&self) -> Result<Vec<ChainRecord>> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
        let records = response
            .json::<Vec<ChainRecord>>()
            .await
            .map_err(|e| RegistryError::Unavailable(format!("bad registry payload: {}", e)))?;
        Ok(records)
    }
}

/// On-disk cache envelope
#[derive(Serialize, Deserialize)]
struct CacheFile {
    timestamp: u64,
    data: Vec<ChainRecord>,
}

struct CacheEntry {
    fetched_at: SystemTime,
    records: Arc<Vec<ChainRecord>>,
}

/// Chain list with an in-memory and on-disk cache
pub struct ChainRegistry {
    source: Arc<dyn RegistrySource>,
    cache_path: PathBuf,
    cache_duration: Duration,
    entry: Mutex<Option<CacheEntry>>,
}

impl ChainRegistry {
    pub fn new(
        source: Arc<dyn RegistrySource>,
        cache_path: impl Into<PathBuf>,
        cache_duration: Duration,
    ) -> Self {
        Self {
            source,
            cache_path: cache_path.into(),
            cache_duration,
            entry: Mutex::new(None),
        }
    }

    /// Current chain records, from cache when fresh.
    ///
    /// The lock is held across a refresh so concurrent callers coalesce
    /// into a single fetch.
    pub async fn records(&self) -> Result<Arc<Vec<ChainRecord>>> {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            let age = cached.fetched_at.elapsed().unwrap_or(Duration::MAX);
            if age < self.cache_duration {
                return Ok(cached.records.clone());
            }
        }

        if entry.is_none() {
            if let Some(from_disk) = self.load_disk_cache() {
                let records = Arc::new(from_disk.1);
                *entry = Some(CacheEntry {
                    fetched_at: from_disk.0,
                    records: records.clone(),
                });
                return Ok(records);
            }
        }

        let records = Arc::new(self.source.fetch().await?);
        self.save_disk_cache(&records);
        *entry = Some(CacheEntry {
            fetched_at: SystemTime::now(),
            records: records.clone(),
        });
        Ok(records)
    }

    /// Records for one chain id
    pub async fn chain(&self, chain_id: u64) -> Result<Vec<ChainRecord>> {
        let records = self.records().await?;
        Ok(records
            .iter()
            .filter(|r| r.chain_id == chain_id)
            .cloned()
            .collect())
    }

    fn load_disk_cache(&self) -> Option<(SystemTime, Vec<ChainRecord>)> {
        let content = std::fs::read_to_string(&self.cache_path).ok()?;
        let file: CacheFile = serde_json::from_str(&content).ok()?;
        let fetched_at = UNIX_EPOCH + Duration::from_secs(file.timestamp);
        let age = fetched_at.elapsed().ok()?;
        if age >= self.cache_duration {
            return None;
        }
        Some((fetched_at, file.data))
    }

    fn save_disk_cache(&self, records: &[ChainRecord]) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let file = CacheFile {
            timestamp,
            data: records.to_vec(),
        };
        let write = (|| -> Result<()> {
            if let Some(parent) = self.cache_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.cache_path, serde_json::to_string(&file)?)?;
            Ok(())
        })();
        if let Err(e) = write {
            tracing::warn!("failed to write chain list cache: {}", e);
        }
    }
}
