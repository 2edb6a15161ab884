//! Comment-Sleuth main entry point
//!
//! This is the command-line interface for the Comment-Sleuth crawler.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use comment_sleuth::analytics::TracingSink;
use comment_sleuth::config::{load_config, resolve_key, Config};
use comment_sleuth::crawler::build_controller;
use comment_sleuth::output::{comments_to_json, load_report, print_comments, print_report};
use comment_sleuth::storage::{Comment, LocalStore};
use comment_sleuth::{ScanMode, ScanStatus};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Comment-Sleuth: find the comments that name the thing
///
/// Crawls the comment threads of one item at a polite fixed pace, scores every
/// comment for "this is the source" signals, and keeps everything in a local
/// SQLite database so scans can be paused and picked up later.
#[derive(Parser, Debug)]
#[command(name = "comment-sleuth")]
#[command(version = "1.0.0")]
#[command(about = "A resumable, rate-limited comment crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and store item details
    Info {
        /// Item (video) id
        container: String,
    },

    /// Crawl comments; Ctrl-C pauses the scan
    Scan {
        container: String,

        #[arg(long, value_enum, default_value_t = ModeArg::Smart)]
        mode: ModeArg,

        /// Delete stored data for the item before scanning
        #[arg(long)]
        fresh: bool,
    },

    /// Highest-scoring comments
    Candidates {
        container: String,

        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Most-liked comments
    Top { container: String },

    /// Case-insensitive keyword search
    Search { container: String, query: String },

    /// Stored item details and counts
    Stats { container: String },

    /// Delete stored data for the item
    Reset { container: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Smart,
    Deep,
}

impl From<ModeArg> for ScanMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Smart => ScanMode::Smart,
            ModeArg::Deep => ScanMode::Deep,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    match cli.command {
        Command::Info { container } => handle_info(&config, &container, cli.json).await,
        Command::Scan {
            container,
            mode,
            fresh,
        } => handle_scan(&config, &container, mode.into(), fresh).await,
        Command::Candidates { container, limit } => {
            let store = open_store(&config)?;
            let comments = store.candidates(&container, limit)?;
            emit("Candidates", &comments, cli.json)
        }
        Command::Top { container } => {
            let store = open_store(&config)?;
            let comments = store.top_liked(&container)?;
            emit("Most liked", &comments, cli.json)
        }
        Command::Search { container, query } => {
            let store = open_store(&config)?;
            let comments = store.search(&container, &query)?;
            emit(&format!("Matches for \"{}\"", query.trim()), &comments, cli.json)
        }
        Command::Stats { container } => {
            let store = open_store(&config)?;
            let report = load_report(&store, &container)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Command::Reset { container } => {
            let store = open_store(&config)?;
            let removed = store.reset_container(&container)?;
            println!("Removed {} comments for {}", removed, container);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("comment_sleuth=info,analytics=info,warn"),
            1 => EnvFilter::new("comment_sleuth=debug,analytics=debug,info"),
            2 => EnvFilter::new("comment_sleuth=trace,analytics=trace,debug"),
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

fn open_store(config: &Config) -> anyhow::Result<LocalStore> {
    let path = Path::new(&config.output.database_path);
    LocalStore::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn emit(title: &str, comments: &[Comment], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", comments_to_json(comments)?);
    } else {
        print_comments(title, comments);
    }
    Ok(())
}

/// Handles `info`: fetches item details and stores them
async fn handle_info(config: &Config, container: &str, json: bool) -> anyhow::Result<()> {
    let key = resolve_key(config)?;
    let controller = build_controller(config, Arc::new(TracingSink))?;

    let Some(meta) = controller.load_item(container, &key).await? else {
        println!("Could not retrieve item details for {}", container);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    } else {
        println!("Title: {}", meta.title);
        println!("Thumbnail: {}", meta.thumbnail_url);
        println!("Comments: {}", meta.total_comment_count);
    }
    Ok(())
}

/// Handles `scan`: runs a scan until it completes, fails, or is interrupted
async fn handle_scan(
    config: &Config,
    container: &str,
    mode: ScanMode,
    fresh: bool,
) -> anyhow::Result<()> {
    let key = resolve_key(config)?;
    let controller = build_controller(config, Arc::new(TracingSink))?;

    if fresh {
        let removed = controller.store().reset_container(container)?;
        tracing::info!("Fresh scan: removed {} stored comments", removed);
    }

    if controller.load_item(container, &key).await?.is_none() {
        tracing::warn!("Scanning without item details");
    }

    let fetched = AtomicU64::new(0);
    let progress = |count: u64| {
        let total = fetched.fetch_add(count, Ordering::Relaxed) + count;
        tracing::info!("Progress: {} comments stored", total);
    };

    let scan = controller.start(container, &key, mode, progress);
    tokio::pin!(scan);

    let state = tokio::select! {
        state = &mut scan => state?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, pausing after the current request");
            controller.cancel(container);
            scan.await?
        }
    };

    match state.status {
        ScanStatus::Complete => println!(
            "Scan complete: {} comments stored this run",
            state.fetched_count
        ),
        ScanStatus::Paused => println!(
            "Scan paused after {} comments; run again to continue",
            state.fetched_count
        ),
        _ => {
            let message = state.error.unwrap_or_else(|| "unknown error".to_string());
            anyhow::bail!("Scan failed after {} comments: {}", state.fetched_count, message);
        }
    }

    Ok(())
}
