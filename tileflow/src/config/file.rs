//! INI configuration file.
//!
//! ```ini
//! [cache]
//! directory = ~/.cache/tileflow/tiles
//! memory_tiles = 96          ; omit to size from [screen]
//! disk_max_entries = 4096
//! disk_max_size = 512MB
//! download_ttl_hours = 168
//!
//! [screen]
//! width = 1920
//! height = 1080
//! tile_size = 256
//! overdraw = 1.2
//!
//! [scheduler]
//! capacity = 128
//! zoom_penalty = 1024
//!
//! [workers]
//! count = 2
//! ```
//!
//! Every key is optional. Missing keys keep their defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::cache::DEFAULT_OVERDRAW;

use super::service::{
    MemoryCapacity, TileServiceConfig, DEFAULT_SCREEN_HEIGHT, DEFAULT_SCREEN_WIDTH, DEFAULT_TILE_SIZE,
};
use super::size::{format_size, parse_size};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// A value could not be interpreted.
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create the configuration directory.
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),

    /// Failed to write the file.
    #[error("Failed to write config file: {0}")]
    WriteError(std::io::Error),
}

/// Loader and writer for the INI representation of [`TileServiceConfig`].
pub struct ConfigFile;

impl ConfigFile {
    /// Load from the default path, falling back to defaults if it is absent.
    pub fn load() -> Result<TileServiceConfig, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<TileServiceConfig, ConfigError> {
        if !path.exists() {
            return Ok(TileServiceConfig::default());
        }
        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<TileServiceConfig, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::ReadError(ini::Error::Parse(e)))?;
        parse_ini(&ini)
    }

    /// Write `config` to `path`, creating parent directories.
    pub fn save_to(config: &TileServiceConfig, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::DirectoryError)?;
        }
        std::fs::write(path, to_config_string(config)).map_err(ConfigError::WriteError)
    }
}

/// Default configuration file path, e.g. `~/.config/tileflow/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tileflow")
        .join("config.ini")
}

fn parse_ini(ini: &Ini) -> Result<TileServiceConfig, ConfigError> {
    let mut config = TileServiceConfig::default();

    // [screen] first so [cache] memory_tiles can override it
    if let Some(section) = ini.section(Some("screen")) {
        let (mut width, mut height, mut tile_size, mut overdraw) = (
            DEFAULT_SCREEN_WIDTH,
            DEFAULT_SCREEN_HEIGHT,
            DEFAULT_TILE_SIZE,
            DEFAULT_OVERDRAW,
        );
        if let Some(v) = section.get("width") {
            width = parse_value("screen", "width", v)?;
        }
        if let Some(v) = section.get("height") {
            height = parse_value("screen", "height", v)?;
        }
        if let Some(v) = section.get("tile_size") {
            tile_size = parse_value("screen", "tile_size", v)?;
        }
        if let Some(v) = section.get("overdraw") {
            overdraw = parse_value("screen", "overdraw", v)?;
            if !overdraw.is_finite() || overdraw <= 0.0 {
                return Err(invalid("screen", "overdraw", v, "must be a positive number"));
            }
        }
        config.memory = MemoryCapacity::Screen {
            width,
            height,
            tile_size,
            overdraw,
        };
    }

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            config.disk.directory = expand_tilde(v.trim());
        }
        if let Some(v) = section.get("memory_tiles") {
            config.memory = MemoryCapacity::Fixed(parse_value("cache", "memory_tiles", v)?);
        }
        if let Some(v) = section.get("disk_max_entries") {
            config.disk.max_entries = parse_value("cache", "disk_max_entries", v)?;
        }
        if let Some(v) = section.get("disk_max_size") {
            config.disk.max_bytes =
                parse_size(v).map_err(|e| invalid("cache", "disk_max_size", v, &e.to_string()))?;
        }
        if let Some(v) = section.get("download_ttl_hours") {
            let hours: u64 = parse_value("cache", "download_ttl_hours", v)?;
            config.disk.download_ttl = Duration::from_secs(hours.saturating_mul(3600));
        }
    }

    if let Some(section) = ini.section(Some("scheduler")) {
        if let Some(v) = section.get("capacity") {
            let capacity: usize = parse_value("scheduler", "capacity", v)?;
            if capacity == 0 {
                return Err(invalid("scheduler", "capacity", v, "must be at least 1"));
            }
            config.scheduler.capacity = capacity;
        }
        if let Some(v) = section.get("zoom_penalty") {
            let penalty: f64 = parse_value("scheduler", "zoom_penalty", v)?;
            if !penalty.is_finite() || penalty < 0.0 {
                return Err(invalid("scheduler", "zoom_penalty", v, "must be a non-negative number"));
            }
            config.scheduler.zoom_penalty = penalty;
        }
    }

    if let Some(section) = ini.section(Some("workers")) {
        if let Some(v) = section.get("count") {
            let count: usize = parse_value("workers", "count", v)?;
            if count == 0 {
                return Err(invalid("workers", "count", v, "must be at least 1"));
            }
            config.worker_count = count;
        }
    }

    Ok(config)
}

fn parse_value<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "not a valid number"))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Render a configuration as INI text.
pub fn to_config_string(config: &TileServiceConfig) -> String {
    let mut out = String::new();
    out.push_str("[cache]\n");
    out.push_str(&format!("directory = {}\n", config.disk.directory.display()));
    if let MemoryCapacity::Fixed(tiles) = config.memory {
        out.push_str(&format!("memory_tiles = {}\n", tiles));
    }
    out.push_str(&format!("disk_max_entries = {}\n", config.disk.max_entries));
    out.push_str(&format!("disk_max_size = {}\n", format_size(config.disk.max_bytes)));
    out.push_str(&format!(
        "download_ttl_hours = {}\n",
        config.disk.download_ttl.as_secs() / 3600
    ));

    if let MemoryCapacity::Screen {
        width,
        height,
        tile_size,
        overdraw,
    } = config.memory
    {
        out.push_str("\n[screen]\n");
        out.push_str(&format!("width = {}\n", width));
        out.push_str(&format!("height = {}\n", height));
        out.push_str(&format!("tile_size = {}\n", tile_size));
        out.push_str(&format!("overdraw = {}\n", overdraw));
    }

    out.push_str("\n[scheduler]\n");
    out.push_str(&format!("capacity = {}\n", config.scheduler.capacity));
    out.push_str(&format!("zoom_penalty = {}\n", config.scheduler.zoom_penalty));

    out.push_str("\n[workers]\n");
    out.push_str(&format!("count = {}\n", config.worker_count));
    out
}
