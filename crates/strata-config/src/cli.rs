//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;
use crate::config::default_config_dir;

/// Strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Strata voxel world engine")]
pub struct CliArgs {
    /// Activation radius in chunks.
    #[arg(long)]
    pub activation_radius: Option<f32>,

    /// Deactivation radius in chunks.
    #[arg(long)]
    pub deactivation_radius: Option<f32>,

    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for saved chunks.
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Generation worker threads (0 = auto).
    #[arg(long)]
    pub workers: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// The config directory to load from.
    pub fn config_dir(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_dir)
    }
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(r) = args.activation_radius {
            self.world.activation_radius = r;
        }
        if let Some(r) = args.deactivation_radius {
            self.world.deactivation_radius = r;
        }
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(ref dir) = args.save_dir {
            self.storage.save_directory = dir.clone();
        }
        if let Some(workers) = args.workers {
            self.world.worker_threads = workers;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
