//! Configuration and API key commands

use crate::cli::Context;
use crate::validate;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the state file path
    Path,

    /// Show current configuration (keys masked)
    Show,

    /// Store an API key (encrypted at rest when RAIL_ENCRYPTION_KEY is set)
    SetKey {
        /// Provider name (e.g. etherscan)
        provider: String,

        /// API key
        key: String,
    },

    /// Delete a stored API key
    DeleteKey {
        /// Provider name
        provider: String,
    },
}

pub fn handle(action: &ConfigCommands, ctx: &Context) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Path => {
            println!("{}", ctx.store.path().display());
        }

        ConfigCommands::Show => {
            println!("State file: {}", ctx.store.path().display());
            println!(
                "Encryption: {}",
                if ctx.settings.encryption_password.is_some() {
                    "enabled"
                } else {
                    "disabled"
                }
            );

            let pools = ctx.pools.list();
            println!("\nChains configured: {}", pools.len());
            for (chain_id, urls) in pools {
                println!("  {} ({} endpoints)", chain_id, urls.len());
            }

            let keys = ctx.store.api_keys();
            println!("\nAPI keys: {}", keys.len());
            for (provider, key) in keys {
                println!("  {}: {}", provider, validate::mask_key(&key));
            }
        }

        ConfigCommands::SetKey { provider, key } => {
            ctx.store.set_api_key(provider, key);
            println!("API key for {} saved.", provider.to_lowercase());
        }

        ConfigCommands::DeleteKey { provider } => {
            if ctx.store.remove_api_key(provider) {
                println!("API key for {} deleted.", provider.to_lowercase());
            } else {
                println!("No API key stored for {}.", provider.to_lowercase());
            }
        }
    }

    Ok(())
}
