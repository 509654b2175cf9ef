//! CLI command implementations.
//!
//! - [`cache`] - Cache inspection (stats)
//! - [`config`] - Configuration management (path, show, init)
//! - [`prefetch`] - Download every tile visible around a position

pub mod cache;
pub mod config;
pub mod prefetch;

use std::path::PathBuf;

use tileflow::config::{ConfigFile, TileServiceConfig};

use crate::error::CliError;

/// Load the configuration from `path`, or from the default location.
pub fn load_config(path: Option<&PathBuf>) -> Result<TileServiceConfig, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}
