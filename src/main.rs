use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use shotwise::commands::search_commands::{self, DEFAULT_SEARCH_LIMIT};
use shotwise::commands::stats_commands::{self, DEFAULT_STATS_COUNT};
use shotwise::commands::watch_commands::{self, WatchOverrides};
use shotwise::config::DEFAULT_DB_FILE;
use shotwise::models::screenshot::SearchFilter;
use shotwise::{logging, Config};

#[derive(Parser)]
#[command(name = "shotwise")]
#[command(about = "Watch a folder for screenshots and catalog them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start watching for new screenshots
    Start(StartArgs),

    /// Explain how to stop a running watcher
    Stop,

    /// Print the version
    Version,

    /// Search recorded screenshots
    Search {
        /// Text to look for in OCR text, window titles and file names
        query: Option<String>,

        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Filter by application name
        #[arg(short, long)]
        app: Option<String>,

        /// Only screenshots from the last N days
        #[arg(long)]
        days: Option<u32>,

        /// Maximum number of results
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,

        /// Path to the database file
        #[arg(long, env = "SHOTWISE_DB", default_value = DEFAULT_DB_FILE)]
        db: PathBuf,
    },

    /// Show catalog statistics
    Stats {
        /// Path to the database file
        #[arg(long, env = "SHOTWISE_DB", default_value = DEFAULT_DB_FILE)]
        db: PathBuf,

        /// Number of categories and apps to list
        #[arg(long, default_value_t = DEFAULT_STATS_COUNT)]
        count: usize,
    },
}

#[derive(Args)]
struct StartArgs {
    /// Directory to watch (default: ~/Pictures/Screenshots)
    #[arg(short, long, env = "SHOTWISE_WATCH_PATH")]
    path: Option<PathBuf>,

    /// Disable text extraction
    #[arg(long)]
    no_ocr: bool,

    /// Keep original file names
    #[arg(long)]
    no_rename: bool,

    /// Disable categorization
    #[arg(long)]
    no_categorize: bool,

    /// Do not look up the active window
    #[arg(long)]
    no_context: bool,

    /// Leave files in the watch directory instead of category folders
    #[arg(long)]
    no_move: bool,

    /// Path to the database file
    #[arg(long, env = "SHOTWISE_DB")]
    db: Option<PathBuf>,

    /// JSON file with custom categories
    #[arg(long)]
    categories: Option<PathBuf>,

    /// Path to config file (default: ~/.config/shotwise/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl StartArgs {
    fn overrides(&self) -> WatchOverrides {
        WatchOverrides {
            path: self.path.clone(),
            db: self.db.clone(),
            categories: self.categories.clone(),
            no_ocr: self.no_ocr,
            no_rename: self.no_rename,
            no_categorize: self.no_categorize,
            no_context: self.no_context,
            no_move: self.no_move,
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl+C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")
}

async fn run_start(args: StartArgs) -> Result<()> {
    let mut config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    args.overrides().apply(&mut config);
    let watch_root = config.resolved_watch_path();

    logging::init(Some(&watch_root), args.verbose).context("Failed to set up logging")?;

    println!("shotwise v{}", env!("CARGO_PKG_VERSION"));
    println!("Watching directory: {}", watch_root.display());
    println!("Press Ctrl+C to stop");

    let mut watcher = watch_commands::start_watcher(&config)
        .with_context(|| format!("Failed to watch {}", watch_root.display()))?;

    shutdown_signal().await?;

    println!("\nStopping watcher...");
    watcher.stop();
    watcher.await_idle();
    info!("watcher stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Start(args) => run_start(args).await,
        Commands::Stop => {
            println!("The watcher can be stopped by pressing Ctrl+C in the terminal running it.");
            println!("There is no separate stop command for a background watcher.");
            Ok(())
        }
        Commands::Version => {
            println!("shotwise {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Search {
            query,
            category,
            app,
            days,
            limit,
            db,
        } => {
            logging::init(None, false)?;
            let filter = SearchFilter {
                query,
                category,
                app_name: app,
                min_date: days.map(|d| search_commands::since_days(d, Utc::now())),
                limit,
            };
            let results = search_commands::search(&db, &filter)
                .with_context(|| format!("Search failed on {}", db.display()))?;
            print!("{}", search_commands::format_results(&results));
            Ok(())
        }
        Commands::Stats { db, count } => {
            logging::init(None, false)?;
            let stats = stats_commands::collect(&db, count)
                .with_context(|| format!("Could not read stats from {}", db.display()))?;
            print!("{}", stats_commands::format_stats(&stats));
            Ok(())
        }
    }
}
