//! Configuration for the Strata world engine.
//!
//! Settings persist to disk as a RON file, and every section falls back to
//! its defaults so old files keep loading. Command-line flags override the
//! loaded values.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE_NAME, Config, DebugConfig, LightingConfig, MAX_RADIUS, StorageConfig, WorldConfig,
    default_config_dir,
};
pub use error::ConfigError;
