//! Configuration.
//!
//! [`TileServiceConfig`] is the in-code configuration, built from defaults
//! with `with_*` setters. [`ConfigFile`] maps it to and from an INI file.

mod file;
mod service;
mod size;

pub use file::{config_file_path, to_config_string, ConfigError, ConfigFile};
pub use service::{
    MemoryCapacity, TileServiceConfig, DEFAULT_SCREEN_HEIGHT, DEFAULT_SCREEN_WIDTH,
    DEFAULT_TILE_SIZE, DEFAULT_WORKER_COUNT,
};
pub use size::{format_size, parse_size, SizeParseError};
