//! Endpoint discovery command

use crate::cli::Context;
use crate::validate;
use clap::Args;

#[derive(Args)]
pub struct DiscoverArgs {
    /// Chain id to find endpoints for
    pub chain_id: u64,

    /// Set the fastest discovered endpoint as the chain's primary
    #[arg(long)]
    pub adopt: bool,

    /// Output format (pretty, json)
    #[arg(long, short, default_value = "pretty")]
    pub output: String,
}

pub async fn handle(args: &DiscoverArgs, ctx: &Context) -> anyhow::Result<()> {
    if !ctx.quiet {
        eprintln!("Querying chain registry for chain {}...", args.chain_id);
    }

    let discovery = ctx.discovery();
    let mut found = discovery.discover(args.chain_id).await?;
    found.sort_by_key(|e| e.latency_ms);

    if args.output == "json" {
        let entries: Vec<_> = found
            .iter()
            .map(|e| serde_json::json!({ "url": e.url, "latency_ms": e.latency_ms }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("Working endpoints for chain {}", args.chain_id);
        println!("{}", "─".repeat(40));
        for endpoint in &found {
            println!("  {} ({} ms)", endpoint.url, endpoint.latency_ms);
        }
    }

    if args.adopt {
        // Fastest first after the sort
        let best = &found[0];
        ctx.pools.set_primary(args.chain_id, &best.url).await?;
        println!(
            "\nPrimary for chain {} set to {}",
            args.chain_id,
            validate::mask_url(&best.url)
        );
    }

    Ok(())
}
