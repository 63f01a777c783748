//! Contract commands

use crate::cli::Context;
use crate::explorer::Explorer;
use crate::validate;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ContractCommands {
    /// Fetch verified contract source (Sourcify, then Etherscan)
    Source {
        /// Contract address
        address: String,

        /// Chain id
        #[arg(long, short, default_value = "1")]
        chain_id: u64,

        /// Write source files to this directory instead of stdout
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

pub async fn handle(action: &ContractCommands, ctx: &Context) -> anyhow::Result<()> {
    match action {
        ContractCommands::Source {
            address,
            chain_id,
            save,
        } => {
            let address = validate::address(address)?;
            let api_key = ctx.etherscan_key();

            if !ctx.quiet {
                eprintln!("Looking up verified source for {}...", address);
            }

            let explorer = Explorer::new(
                &ctx.settings.sourcify_url,
                &ctx.settings.etherscan_url,
                api_key,
            );
            let source = explorer.contract_source(*chain_id, address).await?;

            if let Some(dir) = save {
                std::fs::create_dir_all(dir)?;
                for file in &source.files {
                    // Flatten nested paths so nothing escapes the target dir
                    let name = file.path.replace('/', "_");
                    std::fs::write(dir.join(&name), &file.content)?;
                }
                println!(
                    "Saved {} file(s) from {} to {}",
                    source.files.len(),
                    source.origin,
                    dir.display()
                );
            } else {
                println!(
                    "Verified source for {} (via {}, {} file(s))",
                    address,
                    source.origin,
                    source.files.len()
                );
                for file in &source.files {
                    println!("\n{}", "─".repeat(60));
                    println!("// {}", file.path);
                    println!("{}", "─".repeat(60));
                    println!("{}", file.content);
                }
            }
        }
    }

    Ok(())
}
