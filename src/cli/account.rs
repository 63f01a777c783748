//! Account commands

use crate::cli::Context;
use crate::token::format_units;
use crate::validate;
use alloy::providers::{Provider, ProviderBuilder};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Get native balance of an address
    Balance {
        /// Account address
        address: String,

        /// Chain id
        #[arg(long, short, default_value = "1")]
        chain_id: u64,

        /// Output format (pretty, json)
        #[arg(long, short, default_value = "pretty")]
        output: String,
    },
}

pub async fn handle(action: &AccountCommands, ctx: &Context) -> anyhow::Result<()> {
    match action {
        AccountCommands::Balance {
            address,
            chain_id,
            output,
        } => {
            let address = validate::address(address)?;

            if !ctx.quiet {
                eprintln!("Resolving endpoint for chain {}...", chain_id);
            }
            let url = ctx.pools.resolve(*chain_id).await?;

            let provider = ProviderBuilder::new().on_http(url.parse()?);
            let balance = provider.get_balance(address).await?;
            let formatted = format_units(balance, 18);

            if output == "json" {
                println!(
                    "{}",
                    serde_json::json!({
                        "address": address.to_string(),
                        "chain_id": chain_id,
                        "balance_wei": balance.to_string(),
                        "balance": formatted,
                    })
                );
            } else {
                println!("Balance");
                println!("{}", "─".repeat(40));
                println!("Address:  {}", address);
                println!("Chain:    {}", chain_id);
                println!("Balance:  {}", formatted);
                println!("Wei:      {}", balance);
            }
        }
    }

    Ok(())
}
