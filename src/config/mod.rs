//! Configuration management for HabitForge.
//!
//! Configuration lives in a TOML file with three sections:
//!
//! ```toml
//! [tracker]
//! name = "HabitForge"
//! seed_dir = "data/seeds"
//!
//! [storage]
//! data_dir = "data/habitforge"
//!
//! [logging]
//! level = "info"
//! # file = "habitforge.log"
//! ```
//!
//! Values are validated on load; `habitforge init` writes the defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Core tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Display name used in CLI output.
    pub name: String,
    /// Directory holding quest/challenge/shop seed JSON.
    pub seed_dir: String,
}

/// Data persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the sled database.
    pub data_dir: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level: error, warn, info, debug, trace.
    pub level: String,
    /// Optional log file; when set, log lines are appended here as well.
    #[serde(default)]
    pub file: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to the defaults only when the file
    /// does not exist. Read, parse, and validation failures propagate so a
    /// broken config never silently runs against default paths.
    pub async fn load_or_default(path: &str) -> Result<Self> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let config: Config = toml::from_str(&content)
                    .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(anyhow!("Failed to read config file {}: {}", path, e)),
        }
    }

    /// Create a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            other => Err(anyhow!("unknown logging.level: {}", other)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tracker: TrackerConfig {
                name: "HabitForge".to_string(),
                seed_dir: "data/seeds".to_string(),
            },
            storage: StorageConfig {
                data_dir: "data/habitforge".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).expect("serialize");
        let parsed: Config = toml::from_str(&text).expect("parse");
        assert_eq!(parsed.tracker.name, "HabitForge");
        assert_eq!(parsed.storage.data_dir, "data/habitforge");
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn absent_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("no-such-config.toml");
        let config = Config::load_or_default(path.to_str().unwrap())
            .await
            .expect("defaults");
        assert_eq!(config.storage.data_dir, "data/habitforge");
    }

    #[tokio::test]
    async fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not toml at all [").expect("write");
        assert!(Config::load_or_default(path.to_str().unwrap()).await.is_err());
    }

    #[tokio::test]
    async fn invalid_level_in_config_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let text = r#"
[tracker]
name = "HabitForge"
seed_dir = "data/seeds"

[storage]
data_dir = "data/habitforge"

[logging]
level = "loud"
"#;
        std::fs::write(&path, text).expect("write");
        assert!(Config::load_or_default(path.to_str().unwrap()).await.is_err());
    }
}
