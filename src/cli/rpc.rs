//! RPC endpoint pool commands

use crate::cli::Context;
use crate::validate;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum RpcCommands {
    /// Set the primary endpoint for a chain (probed before accepting)
    Set {
        /// Chain id (1 = Ethereum, 137 = Polygon, ...)
        chain_id: u64,

        /// RPC URL
        url: String,
    },

    /// Add a backup endpoint to an existing pool
    AddBackup {
        /// Chain id
        chain_id: u64,

        /// RPC URL
        url: String,
    },

    /// Promote the first backup to primary (no probe)
    Rotate {
        /// Chain id
        chain_id: u64,
    },

    /// Delete a chain's pool entirely
    Delete {
        /// Chain id
        chain_id: u64,
    },

    /// List all configured pools
    List,

    /// Probe every endpoint in a chain's pool
    Health {
        /// Chain id
        chain_id: u64,

        /// Output format (pretty, json)
        #[arg(long, short, default_value = "pretty")]
        output: String,
    },

    /// Print the first healthy endpoint, promoting it if needed
    Resolve {
        /// Chain id
        chain_id: u64,
    },
}

pub async fn handle(action: &RpcCommands, ctx: &Context) -> anyhow::Result<()> {
    match action {
        RpcCommands::Set { chain_id, url } => {
            if !ctx.quiet {
                eprintln!("Verifying {} against chain {}...", validate::mask_url(url), chain_id);
            }
            ctx.pools.set_primary(*chain_id, url).await?;
            println!("Primary for chain {} set to {}", chain_id, validate::mask_url(url));
        }

        RpcCommands::AddBackup { chain_id, url } => {
            if !ctx.quiet {
                eprintln!("Verifying {} against chain {}...", validate::mask_url(url), chain_id);
            }
            ctx.pools.add_backup(*chain_id, url).await?;
            println!("Backup for chain {} added: {}", chain_id, validate::mask_url(url));
        }

        RpcCommands::Rotate { chain_id } => {
            let new_primary = ctx.pools.rotate(*chain_id)?;
            println!(
                "Chain {} rotated, new primary: {}",
                chain_id,
                validate::mask_url(&new_primary)
            );
        }

        RpcCommands::Delete { chain_id } => {
            ctx.pools.remove(*chain_id)?;
            println!("Pool for chain {} deleted", chain_id);
        }

        RpcCommands::List => {
            let pools = ctx.pools.list();
            if pools.is_empty() {
                println!("No chains configured.");
                println!("\nAdd one with:");
                println!("  railcli rpc set <chain-id> <url>");
                return Ok(());
            }

            for (chain_id, urls) in pools {
                println!("Chain {} ({} endpoints)", chain_id, urls.len());
                for (i, url) in urls.iter().enumerate() {
                    let role = if i == 0 { "primary" } else { "backup" };
                    println!("  [{}] {}", role, validate::mask_url(url));
                }
                println!();
            }
        }

        RpcCommands::Health { chain_id, output } => {
            if !ctx.quiet {
                eprintln!("Probing pool for chain {}...", chain_id);
            }
            let reports = ctx.pools.health(*chain_id).await?;

            if output == "json" {
                let entries: Vec<_> = reports
                    .iter()
                    .map(|(url, r)| {
                        serde_json::json!({
                            "url": validate::mask_url(url),
                            "healthy": r.healthy,
                            "chain_id": r.chain_id,
                            "latency_ms": r.latency_ms,
                            "error": if r.error.is_empty() { None } else { Some(&r.error) },
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("Pool health for chain {}", chain_id);
                println!("{}", "─".repeat(40));
                for (url, report) in &reports {
                    if report.healthy {
                        println!("  ✓ {} ({} ms)", validate::mask_url(url), report.latency_ms);
                    } else {
                        println!("  ✗ {} ({})", validate::mask_url(url), report.error);
                    }
                }
            }
        }

        RpcCommands::Resolve { chain_id } => {
            let url = ctx.pools.resolve(*chain_id).await?;
            println!("{}", url);
        }
    }

    Ok(())
}
