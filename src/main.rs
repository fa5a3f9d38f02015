//! Linkcrawl main entry point
//!
//! This is the command-line interface for the linkcrawl listing resolver.

use clap::{Parser, Subcommand, ValueEnum};
use linkcrawl::config::{load_config_with_hash, parse_daily_at, Config};
use linkcrawl::crawler::{run_comment_refresh, scrape};
use linkcrawl::transport::{build_transport, TransportKind};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Linkcrawl: a listing-page link resolver
///
/// Linkcrawl reads a listing page, follows each item's redirect chain to the media it
/// embeds and writes a date-grouped JSON catalog. It can also keep the catalog fresh on
/// a schedule and serve it over HTTP.
#[derive(Parser, Debug)]
#[command(name = "linkcrawl")]
#[command(version = "1.0.0")]
#[command(about = "A listing-page link resolver", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Override the configured transport
    #[arg(long, value_enum, global = true)]
    transport: Option<TransportArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run one scrape and write the catalog
    Scrape,

    /// Refresh comment counts in the existing catalog
    RefreshComments,

    /// Scrape on a schedule and serve the catalog
    Serve,

    /// Validate config and show what would run without fetching anything
    Check,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum TransportArg {
    Direct,
    Relay,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Direct => TransportKind::Direct,
            TransportArg::Relay => TransportKind::Relay,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let kind = cli
        .transport
        .map(TransportKind::from)
        .unwrap_or(config.transport.kind);

    match cli.command {
        Command::Check => handle_check(&config, kind)?,
        Command::Scrape => handle_scrape(config, kind).await?,
        Command::RefreshComments => handle_refresh(&config, kind).await?,
        Command::Serve => linkcrawl::daemon::serve(Arc::new(config), kind).await?,
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
            0 => EnvFilter::new("linkcrawl=info,warn"),
            1 => EnvFilter::new("linkcrawl=debug,info"),
            2 => EnvFilter::new("linkcrawl=trace,debug"),
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

/// Handles `check`: validates config and shows what would run
fn handle_check(config: &Config, kind: TransportKind) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Linkcrawl Check ===\n");

    println!("Scraper:");
    println!("  Listing: {}", config.scraper.listing_url);
    println!("  Max links: {}", config.scraper.max_links);
    println!("  Max depth: {}", config.scraper.max_depth);
    println!("  Parallelism per host: {}", config.scraper.parallelism);
    println!("  Default date label: {}", config.scraper.default_date);

    println!("\nTransport: {:?}", kind);
    match kind {
        TransportKind::Relay => {
            println!("  Relay endpoint: {}", config.transport.relay_endpoint);
            println!("  Max timeout: {}ms", config.transport.max_timeout);
        }
        TransportKind::Direct => {
            println!("  User agent: {}", config.scraper.user_agent);
            println!(
                "  Request timeout: {}s",
                config.transport.request_timeout_secs
            );
        }
    }

    println!("\nCookies ({}):", config.cookies.len());
    for cookie in &config.cookies {
        let domain = if cookie.domain.is_empty() {
            "*"
        } else {
            cookie.domain.as_str()
        };
        println!("  - {} ({})", cookie.name, domain);
    }

    println!("\nClassifier:");
    println!("  Relay domains: {}", config.classifier.relay_domains.join(", "));
    println!("  Embed patterns: {}", config.classifier.embed_patterns.join(", "));
    println!("  Player patterns: {}", config.classifier.player_patterns.join(", "));

    println!("\nOutput:");
    println!("  Catalog: {}", config.output.catalog_path);

    let daily_at = parse_daily_at(&config.schedule.daily_at)?;
    println!("\nSchedule (serve mode):");
    println!("  Daily scrape at: {}", daily_at.format("%H:%M"));
    match config.schedule.comment_refresh_minutes {
        Some(minutes) => println!("  Comment refresh: every {} minutes", minutes),
        None => println!("  Comment refresh: disabled"),
    }
    println!("  Listening on: {}", config.server.bind);
    println!("  Static files: {}", config.server.static_dir);

    build_transport(config, kind)?;

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would resolve up to {} items from {}",
        config.scraper.max_links, config.scraper.listing_url
    );

    Ok(())
}

/// Handles `scrape`: one full run
async fn handle_scrape(
    config: Config,
    kind: TransportKind,
) -> Result<(), Box<dyn std::error::Error>> {
    match scrape(Arc::new(config), kind).await {
        Ok(summary) => {
            tracing::info!(
                "Catalog written: {} date groups, {} of {} items resolved",
                summary.groups,
                summary.resolved,
                summary.items
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles `refresh-comments`: one refresher pass
///
/// Refresher failures are logged, never returned.
async fn handle_refresh(
    config: &Config,
    kind: TransportKind,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport = build_transport(config, kind)?;
    run_comment_refresh(config, transport.as_ref()).await;
    Ok(())
}
