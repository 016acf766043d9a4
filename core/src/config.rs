//! Configuration management (config.toml)
//!
//! Defaults for loading, generating and exporting maps. Settings are stored in TOML format in
//! the platform-specific config directory; every field falls back to its default when missing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::map::MapLoadOptions;
use crate::script::{
    DEFAULT_EPOCH_TICK_MILLIS, DEFAULT_MAX_MEMORY_BYTES, DEFAULT_MAX_STACK_BYTES, ScriptLimits,
};
use mapforge_shared::{MAX_MAPSCRIPT_RUNTIME_SECS, MAX_PLAYERS, MapType, OutputFormat};

/// File name looked up in [`config_dir`].
pub const CONFIG_FILE: &str = "config.toml";

/// Map tooling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Kind of game maps are loaded for (default: skirmish)
    #[serde(default)]
    pub map_type: MapType,
    /// Player slots on the map (default: 11)
    #[serde(default = "default_max_players")]
    pub max_players: u32,
    /// Seed handed to map scripts (default: 0)
    #[serde(default)]
    pub seed: u32,
    /// Tell map scripts they run for a preview (default: false)
    #[serde(default)]
    pub preview: bool,
    /// Generation written by exports (default: json-v2)
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Map script sandbox limits
    #[serde(default)]
    pub script: ScriptConfig,
}

/// Sandbox limits for map scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Guest call-stack ceiling in bytes (default: 512 KiB)
    #[serde(default = "default_max_stack_bytes")]
    pub max_stack_bytes: usize,
    /// Guest linear memory ceiling in bytes (default: 100 MiB)
    #[serde(default = "default_max_memory_bytes")]
    pub max_memory_bytes: usize,
    /// Wall-clock limit in seconds (default: 30, never more)
    #[serde(default = "default_max_runtime_secs")]
    pub max_runtime_secs: u64,
    /// Interval between deadline polls in milliseconds (default: 10)
    #[serde(default = "default_epoch_tick_millis")]
    pub epoch_tick_millis: u64,
}

fn default_max_players() -> u32 {
    MAX_PLAYERS as u32
}

fn default_max_stack_bytes() -> usize {
    DEFAULT_MAX_STACK_BYTES
}

fn default_max_memory_bytes() -> usize {
    DEFAULT_MAX_MEMORY_BYTES
}

fn default_max_runtime_secs() -> u64 {
    MAX_MAPSCRIPT_RUNTIME_SECS
}

fn default_epoch_tick_millis() -> u64 {
    DEFAULT_EPOCH_TICK_MILLIS
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            map_type: MapType::default(),
            max_players: default_max_players(),
            seed: 0,
            preview: false,
            output_format: OutputFormat::default(),
            script: ScriptConfig::default(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_stack_bytes: default_max_stack_bytes(),
            max_memory_bytes: default_max_memory_bytes(),
            max_runtime_secs: default_max_runtime_secs(),
            epoch_tick_millis: default_epoch_tick_millis(),
        }
    }
}

impl ScriptConfig {
    /// Runtime limits for the sandbox. The runtime is capped at 30 seconds.
    pub fn limits(&self) -> ScriptLimits {
        ScriptLimits::new(
            self.max_stack_bytes,
            self.max_memory_bytes,
            Duration::from_secs(self.max_runtime_secs),
            Duration::from_millis(self.epoch_tick_millis),
        )
    }
}

impl MapConfig {
    /// Load options carrying this configuration's map type, players, seed and limits.
    pub fn load_options(&self) -> MapLoadOptions {
        MapLoadOptions::new(self.map_type, self.max_players)
            .with_seed(self.seed)
            .with_preview(self.preview)
            .with_script_limits(self.script.limits())
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Mapforge\config`
/// On macOS: `~/Library/Application Support/io.mapforge.Mapforge`
/// On Linux: `~/.config/Mapforge`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.mapforge", "", "Mapforge")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from disk.
///
/// Reads `config.toml` from the platform's configuration directory.
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> MapConfig {
    let Some(path) = config_dir().map(|dir| dir.join(CONFIG_FILE)) else {
        return MapConfig::default();
    };
    if !path.exists() {
        return MapConfig::default();
    }
    load_from(&path).unwrap_or_else(|e| {
        tracing::warn!("ignoring {}: {}", path.display(), e);
        MapConfig::default()
    })
}

/// Parses a configuration file.
pub fn load_from(path: &Path) -> Result<MapConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Saves the configuration to `config.toml` in the platform's configuration directory.
///
/// Creates the directory if it doesn't exist.
pub fn save(config: &MapConfig) -> Result<(), ConfigError> {
    if let Some(dir) = config_dir() {
        save_to(config, &dir.join(CONFIG_FILE))?;
    }
    Ok(())
}

/// Writes the configuration to `path`, creating parent directories as needed.
pub fn save_to(config: &MapConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
