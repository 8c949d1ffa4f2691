//! Configuration file support for the hybrid tracker.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/hybrid/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub program: ProgramConfig,

    #[serde(default)]
    pub timers: TimerConfig,

    #[serde(default)]
    pub drive: DriveConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Durable record key and envelope version.
///
/// Older builds of the dashboard wrote under different keys; pointing
/// `key` at one of those lets this build read their records.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_key")]
    pub key: String,

    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
            schema_version: default_schema_version(),
        }
    }
}

/// Program generation options
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProgramConfig {
    /// Also scale rest durations by the deload factor on deload weeks
    #[serde(default)]
    pub scale_rest_on_deload: bool,
}

/// Countdown timer parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "default_global_seconds")]
    pub global_seconds: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            global_seconds: default_global_seconds(),
        }
    }
}

impl TimerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn global_duration(&self) -> Duration {
        Duration::from_secs(self.global_seconds)
    }
}

/// Drive backup configuration
///
/// Backup is disabled while `client_id` is empty.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriveConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            redirect_uri: default_redirect_uri(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl DriveConfig {
    pub fn is_enabled(&self) -> bool {
        !self.client_id.trim().is_empty()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("hybrid")
}

fn default_storage_key() -> String {
    "hybrid_master_51_v2".into()
}

fn default_schema_version() -> u32 {
    2
}

fn default_tick_ms() -> u64 {
    250
}

fn default_global_seconds() -> u64 {
    60
}

fn default_redirect_uri() -> String {
    "http://localhost".into()
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("hybrid").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.storage.key.trim().is_empty() {
            return Err(Error::Config("storage.key must not be empty".into()));
        }
        if self.timers.tick_ms == 0 {
            return Err(Error::Config("timers.tick_ms must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.key, "hybrid_master_51_v2");
        assert_eq!(config.storage.schema_version, 2);
        assert_eq!(config.timers.tick_ms, 250);
        assert_eq!(config.timers.global_seconds, 60);
        assert_eq!(config.drive.poll_interval_ms, 500);
        assert!(!config.program.scale_rest_on_deload);
        assert!(!config.drive.is_enabled());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.storage.key, parsed.storage.key);
        assert_eq!(config.timers.tick_ms, parsed.timers.tick_ms);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[program]
scale_rest_on_deload = true

[drive]
client_id = "abc.apps.googleusercontent.com"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.program.scale_rest_on_deload);
        assert!(config.drive.is_enabled());
        assert_eq!(config.drive.poll_interval_ms, 500); // default
        assert_eq!(config.storage.key, "hybrid_master_51_v2"); // default
    }

    #[test]
    fn test_empty_key_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\nkey = \"\"\n").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load_from() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.storage.key = "hybrid_master_51".into();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.storage.key, "hybrid_master_51");
    }
}
