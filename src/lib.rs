//! railcli - Multi-chain RPC endpoint manager
//!
//! A Rust library and CLI for managing per-chain EVM RPC endpoint pools with
//! health-checked failover, automatic promotion of working backups, and
//! public endpoint discovery from the community chain registry.
//!
//! # Example
//!
//! ```rust,no_run
//! use railcli::config::{Settings, Store};
//! use railcli::rpc::{RpcHealthChecker, RpcPools};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env();
//!     let store = Arc::new(Store::open(&settings.config_path, None)?);
//!     let pools = RpcPools::new(store, Arc::new(RpcHealthChecker::new()), &settings);
//!
//!     pools.set_primary(1, "https://eth.llamarpc.com").await?;
//!     let url = pools.resolve(1).await?;
//!
//!     println!("Using {}", url);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod explorer;
pub mod registry;
pub mod rpc;
pub mod token;
pub mod validate;

// Re-exports for convenience
pub use config::{Settings, Store, StoredState};
pub use error::{
    ConfigError, CryptoError, Error, ExplorerError, RegistryError, Result, RpcError,
};
pub use explorer::{ContractSource, Explorer, SourceFile};
pub use registry::{ChainRecord, ChainRegistry, DiscoveredEndpoint, Discovery, RegistrySource};
pub use rpc::{HealthCheck, HealthReport, RpcHealthChecker, RpcPools};
pub use token::{TokenBalance, TokenClient, TokenInfo};
