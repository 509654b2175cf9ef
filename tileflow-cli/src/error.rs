//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use tileflow::cache::CacheError;
use tileflow::config::ConfigError;
use tileflow::producer::ProducerError;
use tileflow::TileError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read or written
    Config(ConfigError),
    /// Invalid command-line argument
    Argument(TileError),
    /// Cache could not be opened
    Cache(CacheError),
    /// HTTP client could not be created
    Http(ProducerError),
    /// Interrupted before the prefetch finished
    Interrupted,
}

impl CliError {
    /// Exit the process with an error message and a non-zero code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Cache(CacheError::Io(_)) = self {
            eprintln!();
            eprintln!("Check that the cache directory is writable, or pick another");
            eprintln!("one with --cache-dir or [cache] directory in config.ini.");
        }

        let code = match self {
            CliError::Interrupted => 130,
            _ => 1,
        };
        process::exit(code)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Argument(e) => write!(f, "{}", e),
            CliError::Cache(e) => write!(f, "Failed to open tile cache: {}", e),
            CliError::Http(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Interrupted => write!(f, "Interrupted"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Argument(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<TileError> for CliError {
    fn from(e: TileError) -> Self {
        CliError::Argument(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

impl From<ProducerError> for CliError {
    fn from(e: ProducerError) -> Self {
        CliError::Http(e)
    }
}
