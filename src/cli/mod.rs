//! CLI command modules
//!
//! Each subcommand has its own module with argument definitions and handlers.

pub mod account;
pub mod config;
pub mod contract;
pub mod discover;
pub mod rpc;
pub mod token;

use crate::config::{Settings, Store};
use crate::registry::{ChainRegistry, Discovery};
use crate::rpc::{HealthCheck, RpcPools};
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "railcli")]
#[command(
    version,
    about = "Multi-chain RPC endpoint manager with health-checked failover"
)]
#[command(after_help = r#"EXAMPLES:
    # Set the primary RPC for Ethereum mainnet
    railcli rpc set 1 https://eth.llamarpc.com

    # Add a backup and inspect the pool
    railcli rpc add-backup 1 https://rpc.ankr.com/eth
    railcli rpc list

    # Probe every endpoint in a pool
    railcli rpc health 1

    # Find working public endpoints for Polygon
    railcli discover 137

    # Get a native balance
    railcli account balance 0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045

    # ERC-20 metadata
    railcli token info 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48

    # Verified contract source
    railcli contract source 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48

ENVIRONMENT VARIABLES:
    ETHERSCAN_API_KEY     Etherscan API key (optional)
    RAIL_CONFIG_PATH      Override the state file location
    RAIL_RPC_TIMEOUT      Endpoint probe timeout in seconds
    RAIL_MAX_BACKUPS      Backups kept per chain (default 3)
    RAIL_ENCRYPTION_KEY   Password for API key encryption at rest
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Etherscan API key
    #[arg(long, env = "ETHERSCAN_API_KEY", global = true)]
    pub etherscan_key: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage per-chain RPC endpoint pools
    Rpc {
        #[command(subcommand)]
        action: rpc::RpcCommands,
    },

    /// Discover working public endpoints from the chain registry
    Discover(discover::DiscoverArgs),

    /// Account operations (native balance)
    Account {
        #[command(subcommand)]
        action: account::AccountCommands,
    },

    /// ERC-20 token operations (info, balance)
    Token {
        #[command(subcommand)]
        action: token::TokenCommands,
    },

    /// Contract operations (verified source)
    Contract {
        #[command(subcommand)]
        action: contract::ContractCommands,
    },

    /// Manage configuration and stored API keys
    Config {
        #[command(subcommand)]
        action: config::ConfigCommands,
    },
}

/// Shared handles the command handlers work against
pub struct Context {
    pub settings: Settings,
    pub store: Arc<Store>,
    pub pools: Arc<RpcPools>,
    pub checker: Arc<dyn HealthCheck>,
    pub etherscan_key: Option<String>,
    pub quiet: bool,
}

impl Context {
    /// Registry-backed discovery wired from the settings
    pub fn discovery(&self) -> Discovery {
        let registry = Arc::new(ChainRegistry::new(
            Arc::new(crate::registry::HttpRegistrySource::new(
                &self.settings.chain_list_url,
            )),
            &self.settings.cache_path,
            self.settings.cache_duration,
        ));
        Discovery::new(registry, self.checker.clone(), &self.settings)
    }

    /// Etherscan key: CLI flag / env first, then the store
    pub fn etherscan_key(&self) -> Option<String> {
        self.etherscan_key
            .clone()
            .or_else(|| self.store.api_key("etherscan"))
    }
}
