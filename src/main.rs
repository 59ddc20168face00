//! Umbra main entry point
//!
//! This is the command-line interface for the Umbra site mirroring crawler.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use umbra::config::{parse_asset_list, CrawlConfig, RateLimit, ScopeMode};
use umbra::crawler::Coordinator;
use umbra::url::normalize_url;

/// Umbra: a scoped, polite site mirroring crawler
///
/// Umbra crawls a site from a single seed URL, stores a browsable offline
/// mirror with rewritten links, and records per-resource metadata as JSONL.
#[derive(Parser, Debug)]
#[command(name = "umbra")]
#[command(version)]
#[command(about = "A scoped, polite site mirroring crawler", long_about = None)]
struct Cli {
    /// Seed URL to start crawling from (https:// assumed if no scheme)
    #[arg(long, value_name = "URL")]
    url: String,

    /// Record extraction provenance (hints, forms) in crawl.jsonl
    #[arg(long)]
    sources: bool,

    /// Output directory for the mirror tree and metadata
    #[arg(long, value_name = "DIR", default_value = "./out")]
    result: PathBuf,

    /// Maximum number of HTML pages to fetch
    #[arg(long, value_name = "N", default_value_t = 200)]
    max_pages: usize,

    /// Crawl scope: same-origin, same-host or all
    #[arg(long, value_name = "MODE", default_value = "same-origin")]
    scope: String,

    /// Comma-separated asset classes to fetch (js,css,img,font)
    #[arg(long, value_name = "LIST", default_value = "js,css,img,font")]
    include_assets: String,

    /// Honor robots.txt (reserved, currently a no-op)
    #[arg(long)]
    respect_robots: bool,

    /// Maximum link depth from the seed (seed is depth 0)
    #[arg(long, value_name = "N", default_value_t = 3)]
    depth: u32,

    /// Number of concurrent fetch workers
    #[arg(long, value_name = "N", default_value_t = 10)]
    concurrency: usize,

    /// Global request rate, e.g. "5rps" or "0.5"
    #[arg(long, value_name = "RATE", default_value = "5rps")]
    rate: String,

    /// Skip the link rewrite pass, keeping original URLs in stored documents
    #[arg(long)]
    no_rewrite_links: bool,

    /// Additionally store unmodified response bytes under raw/
    #[arg(long)]
    store_raw: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    let coordinator = match Coordinator::new(config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to start crawl: {}", e);
            return Err(e.into());
        }
    };

    // Ctrl-C drains the crawl instead of killing it: in-flight work
    // finishes and the summary still gets written.
    let cancel = coordinator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, draining crawl");
            cancel.cancel();
        }
    });

    let summary = coordinator.run().await?;

    println!("\n=== Crawl Complete ===");
    println!("  Seed: {}", summary.seed_url);
    println!("  Visited URLs: {}", summary.visited);
    println!("  Pages saved: {}", summary.pages_fetched);
    println!("  Assets saved: {}", summary.assets_fetched);
    println!("  Errors: {}", summary.errors);
    println!("  Bytes fetched: {}", summary.bytes_total);
    println!("  Stopped: {:?}", summary.stop_reason);
    println!("\n✓ Mirror written to: {}", summary.output_root);

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("umbra=info,warn"),
            1 => EnvFilter::new("umbra=debug,info"),
            2 => EnvFilter::new("umbra=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Assembles the crawl configuration from parsed CLI flags
fn build_config(cli: &Cli) -> anyhow::Result<CrawlConfig> {
    let seed_url = normalize_url(&cli.url, None)?;
    let scope: ScopeMode = cli.scope.parse()?;
    let include_assets = parse_asset_list(&cli.include_assets)?;
    let rate: RateLimit = cli.rate.parse()?;

    Ok(CrawlConfig {
        seed_url,
        sources: cli.sources,
        result_dir: cli.result.clone(),
        max_pages: cli.max_pages,
        scope,
        include_assets,
        respect_robots: cli.respect_robots,
        max_depth: cli.depth,
        concurrency: cli.concurrency,
        rate,
        rewrite_links: !cli.no_rewrite_links,
        store_raw: cli.store_raw,
    })
}
