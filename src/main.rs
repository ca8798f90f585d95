//! seo-crawl-core command-line interface.

use clap::Parser;
use seo_crawl_core::config::{load_config_with_hash, Config};
use seo_crawl_core::crawler::crawl;
use seo_crawl_core::output::{generate_markdown_summary, generate_summary, load_statistics, print_statistics};
use seo_crawl_core::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// A polite, site-wide SEO crawler.
#[derive(Parser, Debug)]
#[command(name = "seo-crawl-core")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A polite, site-wide SEO crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate a markdown summary from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_summary {
        handle_export_summary(&config)?;
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("seo_crawl_core=info,warn"),
            1 => EnvFilter::new("seo_crawl_core=debug,info"),
            2 => EnvFilter::new("seo_crawl_core=trace,debug"),
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

/// Validates config and prints what would be crawled, without crawling.
fn handle_dry_run(config: &Config) {
    println!("=== Dry Run ===\n");

    println!("Seeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\nTraversal:");
    println!("  Mode: {:?}", config.traversal.mode);
    println!("  Max depth: {:?}", config.traversal.max_depth);
    println!("  Max URLs: {:?}", config.traversal.max_urls);

    println!("\nPoliteness:");
    println!("  Concurrency: {}", config.politeness.concurrency);
    println!("  Requests/sec: {}", config.politeness.requests_per_second);
    println!("  Crawl delay: {}ms", config.politeness.crawl_delay_ms);

    println!("\nRobots:");
    println!("  Respect robots.txt: {}", config.robots.respect_robots_txt);
    println!("  Respect nofollow: {}", config.robots.respect_nofollow);
    println!("  Crawl sitemap URLs: {}", config.robots.crawl_sitemap_urls);

    println!("\nUser agent:");
    println!(
        "  {}/{} ({})",
        config.user_agent.crawler_name, config.user_agent.crawler_version, config.user_agent.contact_url
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\n✓ Configuration is valid");
}

/// Shows statistics from the database and exits.
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let summary = load_statistics(&storage)?;
    print_statistics(&summary);
    Ok(())
}

/// Generates a markdown summary from existing data and exits.
fn handle_export_summary(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Exporting Crawl Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}\n", config.output.summary_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    tracing::info!("Loading crawl data from database...");
    let summary = generate_summary(&storage)?;

    tracing::info!("Generating markdown summary...");
    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;

    println!("✓ Summary exported to: {}", config.output.summary_path);
    Ok(())
}

/// Runs the crawl itself.
async fn handle_crawl(config: Config, config_hash: String) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting crawl with {} seed URL(s)", config.seeds.len());

    match crawl(config, config_hash).await {
        Ok(()) => {
            tracing::info!("Crawl completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
