//! railcli - Multi-chain RPC endpoint manager

use clap::Parser;
use railcli::cli::{self, Cli, Commands, Context};
use railcli::config::{Settings, Store};
use railcli::rpc::{RpcHealthChecker, RpcPools};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let settings = Settings::from_env();
    let store = Arc::new(Store::open(
        &settings.config_path,
        settings.encryption_password.as_deref(),
    )?);
    let checker = Arc::new(RpcHealthChecker::new());
    let pools = Arc::new(RpcPools::new(store.clone(), checker.clone(), &settings));

    let ctx = Context {
        settings,
        store,
        pools,
        checker,
        etherscan_key: cli.etherscan_key.clone(),
        quiet: cli.quiet,
    };

    match &cli.command {
        Commands::Rpc { action } => cli::rpc::handle(action, &ctx).await,
        Commands::Discover(args) => cli::discover::handle(args, &ctx).await,
        Commands::Account { action } => cli::account::handle(action, &ctx).await,
        Commands::Token { action } => cli::token::handle(action, &ctx).await,
        Commands::Contract { action } => cli::contract::handle(action, &ctx).await,
        Commands::Config { action } => cli::config::handle(action, &ctx),
    }
}
