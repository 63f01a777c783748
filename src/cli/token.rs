//! ERC-20 token commands

use crate::cli::Context;
use crate::token::{format_units, TokenClient};
use crate::validate;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Get token info (name, symbol, decimals, supply)
    Info {
        /// Token contract address
        address: String,

        /// Chain id
        #[arg(long, short, default_value = "1")]
        chain_id: u64,

        /// Output format (pretty, json)
        #[arg(long, short, default_value = "pretty")]
        output: String,
    },

    /// Get token balance for a holder
    Balance {
        /// Token contract address
        token: String,

        /// Holder address
        holder: String,

        /// Chain id
        #[arg(long, short, default_value = "1")]
        chain_id: u64,

        /// Output format (pretty, json)
        #[arg(long, short, default_value = "pretty")]
        output: String,
    },
}

pub async fn handle(action: &TokenCommands, ctx: &Context) -> anyhow::Result<()> {
    match action {
        TokenCommands::Info {
            address,
            chain_id,
            output,
        } => {
            let token = validate::address(address)?;

            if !ctx.quiet {
                eprintln!("Fetching token info for {}...", validate::mask_address(address));
            }
            let url = ctx.pools.resolve(*chain_id).await?;
            let client = TokenClient::new(url, ctx.settings.probe_timeout);
            let info = client.info(token).await?;

            let supply_formatted = match (info.total_supply, info.decimals) {
                (Some(supply), Some(decimals)) => Some(format_units(supply, decimals)),
                (Some(supply), None) => Some(supply.to_string()),
                _ => None,
            };

            if output == "json" {
                println!(
                    "{}",
                    serde_json::json!({
                        "address": info.address.to_string(),
                        "chain_id": chain_id,
                        "name": info.name,
                        "symbol": info.symbol,
                        "decimals": info.decimals,
                        "total_supply": info.total_supply.map(|s| s.to_string()),
                    })
                );
            } else {
                println!("Token Info");
                println!("{}", "─".repeat(40));
                println!("Address:  {}", info.address);
                println!("Name:     {}", info.name.as_deref().unwrap_or("(unknown)"));
                println!("Symbol:   {}", info.symbol.as_deref().unwrap_or("(unknown)"));
                println!(
                    "Decimals: {}",
                    info.decimals
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "(unknown)".to_string())
                );
                println!(
                    "Supply:   {}",
                    supply_formatted.as_deref().unwrap_or("(unknown)")
                );
            }
        }

        TokenCommands::Balance {
            token,
            holder,
            chain_id,
            output,
        } => {
            let token = validate::address(token)?;
            let holder = validate::address(holder)?;

            let url = ctx.pools.resolve(*chain_id).await?;
            let client = TokenClient::new(url, ctx.settings.probe_timeout);
            let balance = client.balance_of(token, holder).await?;

            if output == "json" {
                println!(
                    "{}",
                    serde_json::json!({
                        "token": token.to_string(),
                        "holder": holder.to_string(),
                        "chain_id": chain_id,
                        "raw": balance.raw.to_string(),
                        "balance": balance.formatted,
                        "symbol": balance.symbol,
                        "decimals": balance.decimals,
                    })
                );
            } else {
                println!("Token Balance");
                println!("{}", "─".repeat(40));
                println!("Token:    {}", token);
                println!("Holder:   {}", holder);
                println!(
                    "Balance:  {} {}",
                    balance.formatted,
                    balance.symbol.as_deref().unwrap_or("")
                );
                println!("Raw:      {}", balance.raw);
            }
        }
    }

    Ok(())
}
