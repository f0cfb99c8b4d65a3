// src/config/mod.rs
//! Configuration loaded from TOML.
//!
//! Every field has a built-in default, so a missing file or an empty one
//! gives a working setup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the background music files.
    pub asset_dir: PathBuf,
    pub volume: VolumeConfig,
    pub playback: PlaybackConfig,
    /// Extra or replacement catalog entries: track key -> file name.
    pub tracks: BTreeMap<String, String>,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets/sounds/background_sounds"),
            volume: VolumeConfig::default(),
            playback: PlaybackConfig::default(),
            tracks: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Base music volume (0.0 - 1.0)
    pub normal: f32,
    /// Global multiplier (0.0 - 1.0)
    pub global: f32,
    /// Fraction kept while ducked
    pub duck_factor: f32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            normal: 0.8,
            global: 1.0,
            duck_factor: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub start_muted: bool,
    /// Hold playback until the first user gesture
    pub require_user_gesture: bool,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_step_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            start_muted: false,
            require_user_gesture: true,
            max_retries: 2,
            retry_base_delay_ms: 500,
            retry_step_ms: 500,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log file path. The terminal UI owns stdout, so nothing is logged
    /// without one.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Read and validate the config at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate TOML text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Clamp volumes into range and reject settings that cannot work.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.asset_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("asset_dir must not be empty".into()));
        }
        for (name, value) in [
            ("volume.normal", &mut self.volume.normal),
            ("volume.global", &mut self.volume.global),
            ("volume.duck_factor", &mut self.volume.duck_factor),
        ] {
            if value.is_nan() {
                return Err(ConfigError::Invalid(format!("{name} is not a number")));
            }
            *value = value.clamp(0.0, 1.0);
        }
        Ok(())
    }
}
