//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted config inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Largest accepted streaming radius, in chunks.
pub const MAX_RADIUS: f32 = 256.0;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Streaming and generation settings.
    pub world: WorldConfig,
    /// Relight budget and day cycle.
    pub lighting: LightingConfig,
    /// Where and whether edited chunks are saved.
    pub storage: StorageConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World streaming and terrain generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunks within this radius (chunk units) of the viewer are activated.
    pub activation_radius: f32,
    /// Live chunks beyond this radius are evicted. Must exceed
    /// `activation_radius` so chunks near the edge do not thrash.
    pub deactivation_radius: f32,
    /// Generate/load jobs submitted per tick.
    pub activations_per_tick: u32,
    /// Chunks handed to the mesher per tick.
    pub mesh_rebuilds_per_tick: u32,
    /// Finished jobs applied per tick.
    pub max_completions_per_tick: u32,
    /// World seed.
    pub seed: u64,
    /// Generation worker threads (0 = pick from the CPU count).
    pub worker_threads: u32,
    /// Water fills every column up to this height.
    pub sea_level: u32,
}

/// Lighting settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Block light updates per tick (0 = drain to a fixed point every tick).
    pub max_updates_per_tick: u32,
    /// Length of a full day/night cycle in seconds.
    pub day_length_seconds: f32,
}

/// Chunk persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one file per saved chunk.
    pub save_directory: PathBuf,
    /// Save edited chunks on eviction and shutdown.
    pub persist_edits: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log world stats every this many ticks (0 = never).
    pub stats_interval_ticks: u32,
}

// --- Default implementations ---

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            activation_radius: 8.0,
            deactivation_radius: 10.0,
            activations_per_tick: 1,
            mesh_rebuilds_per_tick: 2,
            max_completions_per_tick: 16,
            seed: 0,
            worker_threads: 0,
            sea_level: 64,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            max_updates_per_tick: 0,
            day_length_seconds: 600.0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let save_directory = dirs::data_dir()
            .map(|dir| dir.join("strata").join("saves"))
            .unwrap_or_else(|| PathBuf::from("saves"));
        Self {
            save_directory,
            persist_edits: true,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval_ticks: 300,
        }
    }
}

/// Platform config directory for Strata, or `./config` when the platform
/// has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("strata"))
        .unwrap_or_else(|| PathBuf::from("config"))
}

// --- Validation ---

impl Config {
    /// Checks the values the world cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if !world.activation_radius.is_finite() || world.activation_radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "world.activation_radius must be positive and finite, got {}",
                world.activation_radius
            )));
        }
        if !world.deactivation_radius.is_finite() || world.deactivation_radius > MAX_RADIUS {
            return Err(ConfigError::Invalid(format!(
                "world.deactivation_radius must be finite and at most {MAX_RADIUS}, got {}",
                world.deactivation_radius
            )));
        }
        if world.deactivation_radius <= world.activation_radius {
            return Err(ConfigError::Invalid(format!(
                "world.deactivation_radius ({}) must exceed world.activation_radius ({})",
                world.deactivation_radius, world.activation_radius
            )));
        }
        let budgets = [
            ("world.activations_per_tick", world.activations_per_tick),
            ("world.mesh_rebuilds_per_tick", world.mesh_rebuilds_per_tick),
            ("world.max_completions_per_tick", world.max_completions_per_tick),
        ];
        if let Some((name, _)) = budgets.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
        }
        let day = self.lighting.day_length_seconds;
        if !day.is_finite() || day <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "lighting.day_length_seconds must be positive, got {}",
                self.lighting.day_length_seconds
            )));
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Path of the config file inside `config_dir`.
    pub fn path_in(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        ron::from_str(&text).map_err(ConfigError::ParseError)
    }

    /// Reads `config.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(config_dir);
        if !path.exists() {
            let config = Self::default();
            config.save(config_dir)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }
        let config = Self::read_file(&path)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Writes `config.ron` into `config_dir`, creating the directory. The
    /// file is replaced in one rename so a crash never leaves half a config.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        let path = Self::path_in(config_dir);
        let tmp = path.with_extension("ron.tmp");
        std::fs::write(&tmp, text).map_err(ConfigError::WriteError)?;
        std::fs::rename(&tmp, &path).map_err(ConfigError::WriteError)
    }

    /// Re-reads the file. Returns the new config only when it differs from
    /// `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read_file(&Self::path_in(config_dir))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Config changed on disk");
        Ok(Some(fresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_file_is_readable_ron() {
        let dir = tempfile::tempdir().unwrap();
        Config::default().save(dir.path()).unwrap();
        let text = std::fs::read_to_string(Config::path_in(dir.path())).unwrap();
        assert!(text.contains("activation_radius: 8.0"));
        assert!(text.contains("persist_edits: true"));
        assert!(!dir.path().join("config.ron.tmp").exists());
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(world: (seed: 42), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.world.activation_radius, 8.0);
        assert_eq!(config.lighting, LightingConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_radii() {
        let mut config = Config::default();
        config.world.deactivation_radius = 6.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("deactivation_radius"));
    }

    #[test]
    fn test_validate_rejects_nan_deactivation_radius() {
        let mut config = Config::default();
        config.world.deactivation_radius = f32::NAN;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("deactivation_radius"));

        config.world.deactivation_radius = 10.0;
        config.world.activation_radius = f32::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_radii() {
        let mut config = Config::default();
        config.world.activation_radius = 3.0e9;
        config.world.deactivation_radius = 4.0e9;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.world.activation_radius = 100.0;
        config.world.deactivation_radius = MAX_RADIUS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let mut config = Config::default();
        config.world.mesh_rebuilds_per_tick = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mesh_rebuilds_per_tick"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.world.seed = 1234;
        config.storage.save_directory = dir.path().join("saves");
        config.lighting.max_updates_per_tick = 500;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("nested");
        let config = Config::load_or_create(&config_dir).unwrap();
        assert_eq!(config, Config::default());
        assert!(config_dir.join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.world.activation_radius = 4.0;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().world.activation_radius, 4.0);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{{not valid}}").unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
