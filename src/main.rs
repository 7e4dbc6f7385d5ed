//! Scrape-Guard main entry point
//!
//! This is the command-line interface for validating and fetching URLs
//! through the SSRF-safe fetcher.

use anyhow::{bail, Context};
use clap::Parser;
use scrape_guard::batch::{BatchReport, ProgressEvent, ProgressTracker};
use scrape_guard::config::{default_config, load_config_with_hash, validate, Config};
use scrape_guard::extract::extract_text;
use scrape_guard::{sanitize_for_log, ScrapeClient, UrlValidator, Verdict};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Scrape-Guard: SSRF-safe concurrent fetching
///
/// Every URL is checked (scheme, port, DNS resolution, address ranges)
/// before it is fetched through the configured proxy. Transient failures
/// are retried with exponential backoff.
#[derive(Parser, Debug)]
#[command(name = "scrape-guard")]
#[command(version = "1.0.0")]
#[command(about = "SSRF-safe concurrent URL fetching", long_about = None)]
struct Cli {
    /// URLs to fetch
    #[arg(value_name = "URLS")]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// File with one URL per line (blank lines and # comments are skipped)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,

    /// Per-URL deadline in seconds, including retries
    #[arg(long, value_name = "SECS")]
    task_timeout: Option<u64>,

    /// Only validate the URLs; nothing is fetched
    #[arg(long, conflicts_with = "extract")]
    validate_only: bool,

    /// Print the extracted text of each fetched page
    #[arg(long)]
    extract: bool,

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

    let mut config = load_configuration(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli)?;
    let urls = collect_urls(&cli)?;
    if urls.is_empty() {
        bail!("No URLs given; pass them as arguments or with --input");
    }

    let ok = if cli.validate_only {
        handle_validate(&config, &urls).await
    } else {
        handle_fetch(&config, &cli, urls).await?
    };

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scrape_guard=info,warn"),
            1 => EnvFilter::new("scrape_guard=debug,info"),
            2 => EnvFilter::new("scrape_guard=trace,debug"),
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

fn load_configuration(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return default_config().context("Invalid default configuration");
    };

    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}

/// Writes `--workers` and `--task-timeout` into the config and re-checks it
///
/// Command-line values are held to the same bounds as the config file.
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(workers) = cli.workers {
        config.batch.max_workers = workers;
    }
    if let Some(seconds) = cli.task_timeout {
        config.batch.task_timeout_seconds = seconds;
    }

    validate(config).context("Invalid command-line option")?;
    Ok(())
}

/// Gathers URLs from the command line and the input file, in that order
fn collect_urls(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let mut urls: Vec<String> = cli.urls.iter().map(|u| u.trim().to_string()).collect();

    if let Some(path) = &cli.input {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read URL file {}", path.display()))?;
        urls.extend(parse_url_list(&content));
    }

    urls.retain(|u| !u.is_empty());
    Ok(urls)
}

fn parse_url_list(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
}

/// Handles --validate-only: prints each verdict without fetching
///
/// Does not need the proxy API key.
async fn handle_validate(config: &Config, urls: &[String]) -> bool {
    let validator = UrlValidator::system(config.fetch.resolver_timeout());
    let mut invalid = 0;

    println!("=== URL Validation ===\n");
    for url in urls {
        match validator.check(url).await {
            Verdict::Allowed { addresses } => {
                let addresses: Vec<String> = addresses.iter().map(ToString::to_string).collect();
                println!("  ✓ {} ({})", sanitize_for_log(url), addresses.join(", "));
            }
            Verdict::Rejected(reason) => {
                invalid += 1;
                println!("  ✗ {}: {}", sanitize_for_log(url), reason);
            }
        }
    }

    println!("\n{} valid / {} invalid", urls.len() - invalid, invalid);
    invalid == 0
}

/// Fetches the batch and prints the report
async fn handle_fetch(config: &Config, cli: &Cli, urls: Vec<String>) -> anyhow::Result<bool> {
    let client = ScrapeClient::from_config(config)?;

    let options = client.batch_options();

    // Setup Ctrl+C handler
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight requests");
            interrupt.cancel();
        }
    });

    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(track_progress(rx));

    let report = client
        .fetch_batch_with(urls, options, &cancel, Some(tx))
        .await;
    // The sender is dropped with the batch, which ends the tracker
    let _ = progress.await;

    print_report(&report, cli.extract);
    Ok(report.all_succeeded())
}

async fn track_progress(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) {
    let mut tracker = ProgressTracker::new();

    while let Some(event) = rx.recv().await {
        tracker.apply(&event);
        match &event {
            ProgressEvent::Completed { url, size } => {
                tracing::info!("Fetched {} ({} bytes) | {}", url, size, tracker.stats());
            }
            ProgressEvent::Failed { url, reason } => {
                tracing::info!("Failed {}: {} | {}", url, reason, tracker.stats());
            }
            _ => {}
        }
    }
}

fn print_report(report: &BatchReport, extract: bool) {
    println!("\n=== Batch Report ===\n");
    println!("  Total: {}", report.total);
    println!("  Succeeded: {}", report.succeeded.len());
    println!("  Failed: {}", report.failed.len());
    if let Some(elapsed) = report.elapsed() {
        println!("  Duration: {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    }

    if !report.succeeded.is_empty() {
        println!("\nFetched:");
        for page in &report.succeeded {
            println!(
                "  ✓ {} ({} bytes, {} attempt(s))",
                sanitize_for_log(&page.url),
                page.size,
                page.attempts
            );
        }
    }

    if !report.failed.is_empty() {
        println!("\nFailed:");
        for failed in &report.failed {
            println!("  ✗ {}: {}", sanitize_for_log(&failed.url), failed.kind);
        }
    }

    if extract {
        for page in &report.succeeded {
            println!("\n=== {} ===\n", sanitize_for_log(&page.url));
            println!("{}", extract_text(&page.body));
        }
    }
}
