//! Tileflow CLI - Command-line interface
//!
//! Prefetches map tiles into the on-disk cache and manages configuration.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::prefetch::PrefetchArgs;
use error::CliError;
use tileflow::logging::{default_log_dir, default_log_file, init_logging};

#[derive(Parser)]
#[command(name = "tileflow")]
#[command(version, about = "Viewport-prioritised map tile prefetching and caching", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every tile visible around a position into the cache
    Prefetch(PrefetchArgs),

    /// Inspect the tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,

        /// Cache directory (overrides config)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Prefetch(args) => {
            let config = commands::load_config(cli.config.as_ref())?;
            let _logging = init_logging(&default_log_dir(), default_log_file())
                .map_err(|e| CliError::LoggingInit(e.to_string()))?;
            info!(
                "Tileflow v{} prefetch at {}, {}",
                env!("CARGO_PKG_VERSION"),
                args.lat,
                args.lon
            );
            commands::prefetch::run(args, config).await
        }
        Commands::Cache { action, cache_dir } => {
            let config = commands::load_config(cli.config.as_ref())?;
            commands::cache::run(action, config, cache_dir)
        }
        Commands::Config { command } => commands::config::run(command, cli.config),
    }
}
