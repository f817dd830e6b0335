use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Duration;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sessions::{default_storage_dir, state_dir};

const CONFIG_FILE: &str = "config.toml";
const DEFAULT_MOVE_STEP_MINUTES: i64 = 15;

/// User settings read from `config.toml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `<name>.session` files.
    pub storage_dir: Option<PathBuf>,
    /// Priority proposed when inserting a task.
    pub default_priority: f64,
    /// Length in hours proposed when inserting a task.
    pub default_hours: f64,
    /// How far one move keystroke shifts the selected tasks.
    pub move_step_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: None,
            default_priority: 1.0,
            default_hours: 1.0,
            move_step_minutes: DEFAULT_MOVE_STEP_MINUTES,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Loads the first config found: the explicit path, `FLOWSHOP_CONFIG`, then
    /// `config.toml` in the state directory. A missing default file yields defaults,
    /// a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => match env::var_os("FLOWSHOP_CONFIG") {
                Some(path) if !path.is_empty() => (PathBuf::from(path), true),
                _ => (state_dir().join(CONFIG_FILE), false),
            },
        };

        let config = match fs::read_to_string(&path) {
            Ok(raw) => {
                info!("loaded config from {}", path.display());
                Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
            Err(err) if err.kind() == ErrorKind::NotFound && !required => {
                info!("no config at {}, using defaults", path.display());
                Self::default()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_hours.is_nan() || self.default_hours <= 0.0 {
            return Err(ConfigError::Invalid("default_hours must be > 0".to_string()));
        }
        if self.default_priority.is_nan() || self.default_priority < 0.0 {
            return Err(ConfigError::Invalid("default_priority must be >= 0".to_string()));
        }
        if self.move_step_minutes <= 0 || Duration::try_minutes(self.move_step_minutes).is_none() {
            return Err(ConfigError::Invalid(
                "move_step_minutes must be > 0 and fit a duration".to_string(),
            ));
        }
        Ok(())
    }

    pub fn move_step(&self) -> Duration {
        Duration::try_minutes(self.move_step_minutes)
            .unwrap_or_else(|| Duration::minutes(DEFAULT_MOVE_STEP_MINUTES))
    }

    /// The flag wins over the config file, which wins over the state directory default.
    pub fn storage_dir(&self, cli_dir: Option<PathBuf>) -> PathBuf {
        if let Some(dir) = cli_dir {
            return dir;
        }
        if let Some(dir) = &self.storage_dir {
            if dir.is_relative() {
                warn!("storage_dir {} is relative to the working directory", dir.display());
            }
            return dir.clone();
        }
        default_storage_dir()
    }
}
