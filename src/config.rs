//! TOML configuration for the input subsystem
//!
//! Lives at `<config dir>/padstate/input.toml`. Missing sections and fields
//! fall back to their defaults; a missing file is created with defaults.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::controller::analog::AnalogSettings;

const CONFIG_DIR: &str = "padstate";
const CONFIG_FILE: &str = "input.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub tick_interval_ms: u64,
    pub event_buffer: usize,
    pub poll_interval_us: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            event_buffer: 1000,
            poll_interval_us: 100,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub analog: AnalogSettings,
    pub controller: ControllerConfig,
}

impl InputConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: InputConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("analog.left_deadzone", self.analog.left_deadzone),
            ("analog.right_deadzone", self.analog.right_deadzone),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.controller.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "controller.tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.controller.event_buffer == 0 {
            return Err(ConfigError::Invalid(
                "controller.event_buffer must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading input config from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&content)
    }

    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_toml()?).await?;
        info!("Saved input config to {}", path.display());
        Ok(())
    }

    /// Loads the config at `path`, writing defaults there first if it is missing
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?;

        if !exists {
            warn!(
                "No input config at {}, writing defaults",
                path.display()
            );
            let config = Self::default();
            config
                .save(path)
                .await
                .map_err(|e| eyre!("Failed to write default config: {}", e))?;
            return Ok(config);
        }

        Self::load(path)
            .await
            .map_err(|e| eyre!("Failed to load {}: {}", path.display(), e))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = InputConfig::from_toml("").unwrap();
        assert_eq!(config, InputConfig::default());
        assert_eq!(config.analog.angle_divisions.get(), 32);
        assert_eq!(config.analog.left_deadzone, 0.5);
        assert!(!config.analog.clamp_axis_input);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = InputConfig::from_toml(
            r#"
            [analog]
            angle_divisions = 8
            right_deadzone = 0.25

            [controller]
            tick_interval_ms = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.analog.angle_divisions.get(), 8);
        assert_eq!(config.analog.right_deadzone, 0.25);
        assert_eq!(config.analog.left_deadzone, 0.5);
        assert_eq!(config.controller.tick_interval_ms, 8);
        assert_eq!(config.controller.event_buffer, 1000);
    }

    #[test]
    fn zero_divisions_are_rejected() {
        let result = InputConfig::from_toml("[analog]\nangle_divisions = 0\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn negative_deadzone_is_rejected() {
        let result = InputConfig::from_toml("[analog]\nleft_deadzone = -0.1\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let result = InputConfig::from_toml("[controller]\ntick_interval_ms = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn toml_round_trip() {
        let mut config = InputConfig::default();
        config.analog.clamp_axis_input = true;
        config.controller.poll_interval_us = 250;

        let parsed = InputConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[tokio::test]
    async fn load_or_create_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let created = InputConfig::load_or_create(&path).await.unwrap();
        assert_eq!(created, InputConfig::default());
        assert!(path.exists());

        let mut changed = created.clone();
        changed.analog.angle_divisions = std::num::NonZeroU32::new(8).unwrap();
        changed.save(&path).await.unwrap();

        let loaded = InputConfig::load_or_create(&path).await.unwrap();
        assert_eq!(loaded, changed);
    }
}
