//! Undertow main entry point
//!
//! This is the command-line interface for the Undertow feed crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use undertow::config::{load_config_with_hash, validate_config, Config, Credentials};
use undertow::crawler::run_crawl;
use undertow::report::{write_report, ReportFormat};

/// Undertow: finds the most downvoted replies in a feed
///
/// Undertow pages through a category listing, fetches the reply thread of
/// every post under a fixed request budget and prints the replies that
/// scored below a threshold, most downvoted first. Account credentials are
/// read from UNDERTOW_CLIENT_ID, UNDERTOW_CLIENT_SECRET, UNDERTOW_USERNAME
/// and UNDERTOW_PASSWORD.
#[derive(Parser, Debug)]
#[command(name = "undertow")]
#[command(version)]
#[command(about = "Finds the most downvoted replies in a feed", long_about = None)]
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

    /// Override the number of feed pages to request
    #[arg(long)]
    pages: Option<u32>,

    /// Override the score threshold (replies strictly below it are reported)
    #[arg(long, allow_hyphen_values = true)]
    threshold: Option<i64>,

    /// Override the category to crawl
    #[arg(long)]
    category: Option<String>,

    /// Report format written to standard output
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout carries only the report
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli).context("invalid command-line override")?;

    let credentials = Credentials::from_env().context("missing account credentials")?;

    let api = config.api.clone();
    let report = match run_crawl(config, &credentials).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    if report.is_partial() {
        tracing::warn!(
            "{} requests failed; the report covers only what was collected",
            report.stats.failed_requests
        );
    }

    write_report(std::io::stdout().lock(), &report, cli.format, &api)
        .context("failed to write report")?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("undertow=info,warn"),
            1 => EnvFilter::new("undertow=debug,info"),
            2 => EnvFilter::new("undertow=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<(), undertow::ConfigError> {
    if let Some(pages) = cli.pages {
        config.crawl.pages = pages;
    }
    if let Some(threshold) = cli.threshold {
        config.crawl.threshold = threshold;
    }
    if let Some(category) = &cli.category {
        config.crawl.category = category.clone();
    }

    validate_config(config)
}
