//! Error types for railcli

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// RPC pool and failover errors
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Chain registry / discovery errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration and validation errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Block explorer lookup errors
    #[error("Explorer error: {0}")]
    Explorer(#[from] ExplorerError),

    /// Encryption errors
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// RPC pool and failover errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("no RPC configuration for chain {chain_id}; set a primary endpoint first")]
    NoConfiguration { chain_id: u64 },

    #[error("all endpoints failed for chain {chain_id}: {}{}", failed.join(", "),
        if *extra > 0 { format!(" (+{} more)", extra) } else { String::new() })]
    AllEndpointsFailed {
        chain_id: u64,
        /// Masked URLs of the first failed endpoints (at most 3)
        failed: Vec<String>,
        /// Count of additional failures beyond the ones listed
        extra: usize,
    },

    #[error("endpoint {url} is unreachable or on the wrong chain: {reason}")]
    EndpointUnreachable { url: String, reason: String },

    #[error("no primary RPC configured for chain {chain_id}; add one before backups")]
    NoPrimary { chain_id: u64 },

    #[error("endpoint {url} already present in the pool for chain {chain_id}")]
    DuplicateEndpoint { chain_id: u64, url: String },

    #[error("no backup RPCs to rotate to for chain {chain_id}")]
    NoBackupAvailable { chain_id: u64 },

    #[error("endpoint pool for chain {chain_id} is full (capacity {capacity})")]
    PoolFull { chain_id: u64, capacity: usize },

    #[error("no RPC configuration found for chain {chain_id}")]
    NotConfigured { chain_id: u64 },
}

/// Chain registry and endpoint discovery errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("chain registry unavailable: {0}")]
    Unavailable(String),

    #[error("no probeable endpoint candidates found for chain {chain_id}")]
    NoCandidates { chain_id: u64 },

    #[error("no reliable endpoints for chain {chain_id}: all {probed} probed candidates failed")]
    NoReliableEndpoints { chain_id: u64, probed: usize },
}

/// Configuration and input validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid chain ID: {0} (must be a positive integer)")]
    InvalidChainId(u64),

    #[error("invalid RPC URL: {0} (must start with http:// or https://)")]
    InvalidUrl(String),

    #[error("invalid address format: {0}")]
    InvalidAddress(String),

    #[error("invalid state file: {0}")]
    InvalidFile(String),
}

/// Block explorer lookup errors
#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("contract not found or not verified on any source")]
    NotVerified,

    #[error("no API key configured for {0}; store one with `railcli config set-key`")]
    MissingApiKey(String),

    #[error("explorer request failed: {0}")]
    Fetch(String),
}

/// Encryption/decryption errors
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid encryption key or salt: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed (wrong password?): {0}")]
    DecryptionFailed(String),
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
