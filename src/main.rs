//! Listing-Harvest main entry point
//!
//! This is the command-line interface for the Listing-Harvest catalog crawler.

use anyhow::Context;
use clap::Parser;
use listing_harvest::config::{load_config_with_hash, Config};
use listing_harvest::crawler::crawl;
use listing_harvest::state::ResumeStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Listing-Harvest: a resumable catalog listing harvester
///
/// Walks a paginated category listing, extracts product records with an
/// LLM, and appends new records to a CSV file. Progress is saved after
/// every page so an interrupted run resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version)]
#[command(about = "A resumable catalog listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "listing-harvest.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from page 1, discarding the saved resume state
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "fresh")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let dotenv = dotenvy::dotenv();

    setup_logging(cli.verbose, cli.quiet);
    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(&config, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvest=info,warn"),
            1 => EnvFilter::new("listing_harvest=debug,info"),
            2 => EnvFilter::new("listing_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Listing-Harvest Dry Run ===\n");

    println!("Listing:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Selector: {}", config.crawler.css_selector);
    println!("  Page parameter: {}", config.crawler.page_param);
    println!("  Session: {}", config.crawler.session_id);
    println!("  Page delay: {}ms", config.crawler.page_delay);
    println!(
        "  Retries: {} (after {}ms)",
        config.crawler.max_fetch_retries, config.crawler.retry_delay
    );
    if let Some(max) = config.crawler.max_pages {
        println!("  Page limit: {}", max);
    }

    println!("\nRecord fields ({}):", config.schema.required_fields.len());
    for field in &config.schema.required_fields {
        println!("  - {}", field);
    }

    println!("\nExtractor:");
    println!("  Endpoint: {}", config.extractor.endpoint);
    println!("  Model: {}", config.extractor.model);
    let key_state = if std::env::var_os(&config.extractor.api_key_env).is_some() {
        "set"
    } else {
        "NOT SET"
    };
    println!("  API key (${}): {}", config.extractor.api_key_env, key_state);

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);
    println!("  Resume state: {}", config.output.resume_path);
    println!("  Flush: {:?}", config.output.flush);

    let resume = ResumeStore::new(&config.output.resume_path);
    println!("\n✓ Configuration is valid");
    match resume.next_page() {
        Some(page) => println!("✓ Would start crawling at page {}", page),
        None => println!("✓ Stored progress is at the last possible page; nothing to crawl"),
    }
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, fresh: bool) -> anyhow::Result<()> {
    tracing::info!("Crawling {}", config.crawler.base_url);

    // The run prints its own summary and extractor usage
    let report = crawl(config, fresh).await.context("crawl failed")?;
    tracing::debug!("Crawl ended in state {}", report.final_state());

    Ok(())
}
