//! campuscrawl: a polite crawler for a fixed set of academic domains

mod commands;

use anyhow::Result;
use campuscrawl::config::{Config, LogFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "campuscrawl")]
#[command(about = "Polite multi-threaded crawler for academic domains")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "crawler.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from the seeds, or resume the saved frontier
    Crawl {
        /// Discard saved state and start over from the seeds
        #[arg(long)]
        restart: bool,

        /// Number of worker threads
        #[arg(short, long)]
        threads: Option<usize>,

        /// Minimum delay between requests to one host (ms)
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Frontier database path
        #[arg(long)]
        save_file: Option<PathBuf>,

        /// Seed URLs (default: configured seeds)
        seeds: Vec<String>,
    },

    /// Report progress of the saved crawl
    Progress,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Missing config file means defaults; a broken one is an error
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    let log_level = config.logging.effective_level(cli.verbose);
    match config.logging.format {
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_thread_names(true)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_thread_names(true)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    match cli.command {
        Commands::Crawl {
            restart,
            threads,
            delay_ms,
            save_file,
            seeds,
        } => {
            let overrides = commands::crawl::CrawlOverrides {
                restart,
                threads,
                delay_ms,
                save_file,
                seeds,
            };
            commands::crawl::run_crawl(config, overrides)
        }
        Commands::Progress => commands::progress::show_progress(&config),
    }
}
