//! Configuration management CLI commands.

use std::path::PathBuf;

use clap::Subcommand;
use tileflow::config::{config_file_path, to_config_string, ConfigFile, TileServiceConfig};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let path = config_path.unwrap_or_else(config_file_path);
    match command {
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = ConfigFile::load_from(&path)?;
            print!("{}", to_config_string(&config));
            Ok(())
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                println!("Configuration already exists at {}", path.display());
                println!("Use --force to overwrite it.");
                return Ok(());
            }
            ConfigFile::save_to(&TileServiceConfig::default(), &path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}
