//! Runtime settings
//!
//! All knobs are resolved once at startup: built-in defaults first, then
//! `RAIL_*` environment overrides. Components receive a populated
//! [`Settings`] and never read the environment themselves.

use std::path::PathBuf;
use std::time::Duration;

/// Typed configuration for all components
#[derive(Debug, Clone)]
pub struct Settings {
    /// Maximum backup endpoints per chain (pool size is this + 1)
    pub max_backups: usize,
    /// Timeout for the thorough probe used by `rpc set` / `rpc add-backup`
    pub verify_timeout: Duration,
    /// Timeout for failover probes inside `resolve`
    pub probe_timeout: Duration,
    /// Timeout for discovery probes (many candidates, keep it tight)
    pub discovery_timeout: Duration,
    /// How long a fetched chain registry stays valid
    pub cache_duration: Duration,
    /// Maximum registry candidates probed per discovery call
    pub max_candidates: usize,
    /// Concurrent discovery probes
    pub discovery_concurrency: usize,
    /// Remote chain registry URL
    pub chain_list_url: String,
    /// Sourcify server base URL
    pub sourcify_url: String,
    /// Etherscan v2 API base URL
    pub etherscan_url: String,
    /// Persistent state file (pools + API keys)
    pub config_path: PathBuf,
    /// Chain registry cache file
    pub cache_path: PathBuf,
    /// Password for API key encryption at rest, if enabled
    pub encryption_password: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let base = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("railcli");

        Self {
            max_backups: 3,
            verify_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            discovery_timeout: Duration::from_secs(3),
            cache_duration: Duration::from_secs(3600),
            max_candidates: 10,
            discovery_concurrency: 5,
            chain_list_url: "https://chainid.network/chains.json".to_string(),
            sourcify_url: "https://sourcify.dev/server".to_string(),
            etherscan_url: "https://api.etherscan.io/v2/api".to_string(),
            config_path: base.join("state.json"),
            cache_path: base.join("chain_cache.json"),
            encryption_password: None,
        }
    }
}

impl Settings {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Some(path) = env_var("RAIL_CONFIG_PATH") {
            settings.config_path = PathBuf::from(path);
        }
        if let Some(path) = env_var("RAIL_CACHE_FILE") {
            settings.cache_path = PathBuf::from(path);
        }
        if let Some(secs) = env_var("RAIL_CACHE_DURATION").and_then(|v| v.parse().ok()) {
            settings.cache_duration = Duration::from_secs(secs);
        }
        if let Some(secs) = env_var("RAIL_RPC_TIMEOUT").and_then(|v| v.parse().ok()) {
            settings.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = env_var("RAIL_MAX_BACKUPS").and_then(|v| v.parse().ok()) {
            settings.max_backups = n;
        }
        settings.encryption_password = env_var("RAIL_ENCRYPTION_KEY");

        settings
    }

    /// Pool capacity: primary plus backups
    pub fn max_pool_size(&self) -> usize {
        self.max_backups + 1
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
