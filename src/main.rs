//! Sitemap-Ripple main entry point
//!
//! This is the command-line interface for the Sitemap-Ripple crawler.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sitemap_ripple::config::{load_config, validate_crawler_config, Config};
use sitemap_ripple::crawler::{Coordinator, HttpBatchWorker};
use sitemap_ripple::output::{write_sitemap, SitemapOptions};
use sitemap_ripple::service::{CrawlStatus, SitemapService, SitemapSource};
use sitemap_ripple::storage::SqliteStateStore;
use sitemap_ripple::CrawlOptions;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

type Service = SitemapService<HttpBatchWorker, SqliteStateStore>;

/// Sitemap-Ripple: a round-based sitemap crawler
///
/// Crawls a single website from a seed URL, following links within the
/// site while respecting robots.txt, and writes an XML sitemap of the
/// pages it found. Crawl state is kept in a SQLite database so an
/// interrupted crawl can be resumed.
#[derive(Parser, Debug)]
#[command(name = "sitemap-ripple")]
#[command(version = "1.0.0")]
#[command(about = "A round-based sitemap crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site and write its sitemap
    Crawl {
        /// Seed URL
        url: String,

        /// Maximum link depth from the seed
        #[arg(long)]
        max_depth: Option<u32>,

        /// Maximum number of pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Leave image entries out of the sitemap
        #[arg(long)]
        no_images: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Continue an interrupted crawl and write its sitemap
    Resume {
        /// Crawl id
        id: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the progress of a crawl
    Status {
        /// Crawl id
        id: String,
    },

    /// Cancel a crawl
    Cancel {
        /// Crawl id
        id: String,
    },

    /// Write the sitemap of a stored crawl
    Sitemap {
        /// Crawl id
        id: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Remove expired crawls from the state database
    Sweep,
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Sitemap file (defaults to the configured sitemap path)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write the sitemap without indentation
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    let service = build_service(&config)?;

    match cli.command {
        Command::Crawl {
            url,
            max_depth,
            max_pages,
            no_images,
            output,
        } => {
            let mut crawler = config.crawler.clone();
            if let Some(depth) = max_depth {
                crawler.max_depth = depth;
            }
            if let Some(pages) = max_pages {
                crawler.max_pages = pages;
            }
            if no_images {
                crawler.include_images = false;
            }
            validate_crawler_config(&crawler).context("Invalid crawl options")?;

            let id = service
                .start_crawl(&url, CrawlOptions::from(&crawler))
                .context("Failed to start crawl")?;
            println!("Crawl id: {}", id);

            handle_run(&service, &config, &id, &output).await?;
        }
        Command::Resume { id, output } => {
            service.check_options(&id, &CrawlOptions::from(&config.crawler))?;
            handle_run(&service, &config, &id, &output).await?;
        }
        Command::Status { id } => handle_status(&service, &id)?,
        Command::Cancel { id } => {
            service.cancel(&id)?;
            println!("Cancelled {}", id);
        }
        Command::Sitemap { id, output } => handle_sitemap(&service, &config, &id, &output)?,
        Command::Sweep => {
            let removed = service.sweep()?;
            println!("Removed {} expired crawls", removed);
        }
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
            0 => EnvFilter::new("sitemap_ripple=info,warn"),
            1 => EnvFilter::new("sitemap_ripple=debug,info"),
            2 => EnvFilter::new("sitemap_ripple=trace,debug"),
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

fn build_service(config: &Config) -> Result<Service> {
    let database = Path::new(&config.storage.database_path);
    let mut store = SqliteStateStore::new(database)
        .with_context(|| format!("Failed to open state database {}", database.display()))?
        .with_ttl(config.storage.ttl());
    if let Some(limit) = config.storage.max_snapshot_bytes {
        store = store.with_max_snapshot_bytes(limit);
    }

    let user_agent = config.user_agent.user_agent();
    let timeout = CrawlOptions::from(&config.crawler).request_timeout();
    let worker =
        HttpBatchWorker::new(&user_agent, timeout).context("Failed to build HTTP client")?;

    let coordinator = Coordinator::new(worker, store)
        .with_retain_on_overflow(config.storage.retain_on_overflow);
    Ok(SitemapService::new(coordinator))
}

/// Runs a crawl to its end, then writes the sitemap
///
/// Ctrl+C abandons the round in flight. Its URLs are still marked in flight
/// in the store and go back to the frontier when the crawl is resumed.
async fn handle_run(service: &Service, config: &Config, id: &str, output: &OutputArgs) -> Result<()> {
    tokio::select! {
        result = service.run_to_completion(id) => {
            let state = result.with_context(|| format!("Crawl {} failed", id))?;
            tracing::info!(
                "Crawl {} finished: {} pages processed, {} discovered",
                id,
                state.urls_count.processed,
                state.urls_count.total
            );
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted. Resume with: sitemap-ripple resume {}", id);
            return Ok(());
        }
    }

    handle_sitemap(service, config, id, output)
}

fn handle_status(service: &Service, id: &str) -> Result<()> {
    match service.status(id)? {
        CrawlStatus::Running(progress) => {
            println!("Status: running");
            println!(
                "  Scanned: {} / {} ({}%)",
                progress.urls_scanned, progress.total_urls, progress.percent_complete
            );
            println!("  Elapsed: {}", progress.time_elapsed);
            println!("  Remaining: {}", progress.estimated_time_remaining);
            if !progress.current_url.is_empty() {
                println!("  Current: {}", progress.current_url);
            }
        }
        CrawlStatus::Complete(result) => {
            println!("Status: complete");
            println!("  Start URL: {}", result.start_url);
            println!("  Pages: {}", result.urls.len());
            println!("  Crawl time: {}s", result.crawl_time);
        }
        CrawlStatus::Cancelled(progress) => {
            println!("Status: cancelled");
            println!(
                "  Scanned: {} / {}",
                progress.urls_scanned, progress.total_urls
            );
        }
    }
    Ok(())
}

fn handle_sitemap(service: &Service, config: &Config, id: &str, output: &OutputArgs) -> Result<()> {
    let path = output
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.sitemap_path));

    let include_images = service.coordinator().load(id)?.options.include_images;
    let options = SitemapOptions {
        hostname: config.output.hostname.clone(),
        include_images,
        pretty: config.output.pretty && !output.compact,
        default_lastmod: None,
    };

    let document = service
        .generate_sitemap(SitemapSource::Crawl {
            id: id.to_string(),
            options,
        })
        .context("Failed to generate sitemap")?;
    write_sitemap(&path, &document.xml)?;

    println!("✓ Sitemap written to: {}", path.display());
    Ok(())
}
