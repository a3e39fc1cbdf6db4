use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use newswatch::config::Config;
use newswatch::fetch::PageFetcher;
use newswatch::scheduler::{RunOptions, Scheduler};
use newswatch::sites::{SelectorAdapter, SiteRegistry};
use newswatch::storage::Database;

#[derive(Parser)]
#[command(name = "newswatch")]
#[command(about = "Track post-publication edits to news articles")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stdout
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover new articles and refresh the ones that are due
    Scan {
        /// Refresh every tracked article regardless of schedule
        #[arg(long)]
        all: bool,

        /// Force a stored version per pass by marking every snapshot
        #[arg(long, alias = "fakeadiff")]
        fake_diff: bool,
    },
    /// Print store counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::from_env()?,
    };

    init_logging(&config, cli.verbose)?;

    match cli.command {
        Command::Scan { all, fake_diff } => run_scan(&config, all, fake_diff).await,
        Command::Stats => run_stats(&config),
    }
}

fn init_logging(config: &Config, verbose: bool) -> anyhow::Result<()> {
    let stdout_filter = if verbose {
        EnvFilter::new("newswatch=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };
    let stdout_layer = tracing_subscriber::fmt::layer().with_filter(stdout_filter);

    let debug_layer = match &config.logging.debug_log {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening debug log {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    let error_layer = match &config.logging.error_log {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening error log {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_filter(LevelFilter::WARN),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(debug_layer)
        .with(error_layer)
        .init();
    Ok(())
}

fn build_registry(config: &Config) -> anyhow::Result<SiteRegistry> {
    let fetcher = Arc::new(PageFetcher::new(
        config.request_timeout(),
        &config.fetch.user_agent,
    )?);

    let mut registry = SiteRegistry::new();
    for site in &config.sites {
        registry.register(Arc::new(SelectorAdapter::new(
            site.clone(),
            Arc::clone(&fetcher),
        )));
    }
    Ok(registry)
}

async fn run_scan(config: &Config, all: bool, fake_diff: bool) -> anyhow::Result<()> {
    let registry = build_registry(config)?;
    if registry.is_empty() {
        tracing::warn!("no sites configured, nothing to scan");
        return Ok(());
    }

    let db = Arc::new(Database::open(&config.database.sqlite_path)?);
    let scheduler = Scheduler::new(registry, db, config.diff_timeout());

    let report = scheduler
        .run(RunOptions {
            do_all: all,
            fake_diff,
        })
        .await?;

    println!(
        "scan: {} new, {} checked, {} updated, {} failed",
        report.discovered, report.checked, report.updated, report.failed
    );
    Ok(())
}

fn run_stats(config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.sqlite_path)?;
    let stats = db.stats()?;
    println!("articles: {}", stats.articles);
    println!("versions: {}", stats.versions);
    println!("blobs:    {}", stats.blobs);
    Ok(())
}
