//! Configuration loading and config file resolution
//!
//! Bootstrap configuration comes from a TOML file resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CADENCE_CONFIG`)
//! 3. Platform config directory (`<config_dir>/cadence/config.toml`)
//! 4. Built-in defaults (fallback)
//!
//! A missing file never prevents startup; a malformed one does.

use crate::events::PlayMode;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CADENCE_CONFIG";

/// Bounds applied to the progress tick period
pub const MIN_PROGRESS_INTERVAL_MS: u64 = 100;
pub const MAX_PROGRESS_INTERVAL_MS: u64 = 5000;

/// Top-level TOML configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Playback controller settings
    #[serde(default)]
    pub player: PlayerSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Playback controller settings
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSettings {
    /// Play mode at startup
    #[serde(default)]
    pub default_mode: PlayMode,

    /// Volume used while priority is lost but ducking is allowed
    #[serde(default = "default_duck_volume")]
    pub duck_volume: f32,

    /// Progress notification period while Playing
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Commands held back while a track is preparing
    #[serde(default = "default_max_deferred_commands")]
    pub max_deferred_commands: usize,

    /// Fixed seed for shuffle draws (random when absent)
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            default_mode: PlayMode::default(),
            duck_volume: default_duck_volume(),
            progress_interval_ms: default_progress_interval_ms(),
            max_deferred_commands: default_max_deferred_commands(),
            shuffle_seed: None,
        }
    }
}

impl PlayerSettings {
    /// Clamp values into their supported ranges, warning about each correction
    pub fn validated(mut self) -> Self {
        if !(0.0..=1.0).contains(&self.duck_volume) || self.duck_volume.is_nan() {
            warn!("duck_volume {} out of range, clamping to 0.0-1.0", self.duck_volume);
            self.duck_volume = if self.duck_volume.is_nan() {
                default_duck_volume()
            } else {
                self.duck_volume.clamp(0.0, 1.0)
            };
        }

        let clamped = self
            .progress_interval_ms
            .clamp(MIN_PROGRESS_INTERVAL_MS, MAX_PROGRESS_INTERVAL_MS);
        if clamped != self.progress_interval_ms {
            warn!(
                "progress_interval_ms {} out of range, using {}",
                self.progress_interval_ms, clamped
            );
            self.progress_interval_ms = clamped;
        }

        if self.max_deferred_commands == 0 {
            warn!("max_deferred_commands 0 would reject every command while preparing, using 1");
            self.max_deferred_commands = 1;
        }

        self
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_duck_volume() -> f32 {
    0.1
}

fn default_progress_interval_ms() -> u64 {
    1000
}

fn default_max_deferred_commands() -> usize {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: TomlConfig = toml::from_str(content)?;
        config.player = config.player.validated();
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Err(Error::Config(format!(
                "{} is a directory, not a config file",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load configuration, falling back to defaults when no file exists
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                info!("No config file location available, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Config file resolution:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. Platform config directory
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path()
}

/// Platform default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cadence").join("config.toml"))
}
