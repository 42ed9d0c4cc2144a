//! Configuration loading.
//!
//! Settings come from an optional TOML file at `$TUTOR_CONFIG` or
//! `<config_dir>/tutor/config.toml`. `TUTOR_DB` and `TUTOR_API_URL` override
//! the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, TutorError};

const APP_DIR: &str = "tutor";
const DEFAULT_DB_NAME: &str = "tutor.db";

pub const CONFIG_ENV: &str = "TUTOR_CONFIG";
pub const DB_ENV: &str = "TUTOR_DB";
pub const API_URL_ENV: &str = "TUTOR_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub progress: ProgressConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Tutor API connection. Without a base URL the offline tutor answers.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Average lesson scores at or above `strength_threshold` count as a
/// strength, below `weakness_threshold` as a weakness.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_strength_threshold")]
    pub strength_threshold: f64,
    #[serde(default = "default_weakness_threshold")]
    pub weakness_threshold: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            strength_threshold: default_strength_threshold(),
            weakness_threshold: default_weakness_threshold(),
        }
    }
}

fn default_strength_threshold() -> f64 {
    80.0
}

fn default_weakness_threshold() -> f64 {
    60.0
}

impl ProgressConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("strength_threshold", self.strength_threshold),
            ("weakness_threshold", self.weakness_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(TutorError::Config(format!(
                    "progress.{} must be between 0 and 100",
                    name
                )));
            }
        }
        if self.weakness_threshold > self.strength_threshold {
            return Err(TutorError::Config(
                "progress.weakness_threshold cannot exceed progress.strength_threshold".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error. `RUST_LOG` wins when set.
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

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

impl Config {
    /// Loads the config file if there is one, then applies env overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(Self::config_path);

        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            tracing::info!("No config file found at {:?}, using defaults", path);
            Config::default()
        };

        config.apply_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(DB_ENV).ok(),
        );
        config.progress.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TutorError::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| TutorError::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    pub fn apply_overrides(&mut self, api_url: Option<String>, db_path: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = Some(url);
        }
        if let Some(path) = db_path.filter(|p| !p.trim().is_empty()) {
            self.database.path = Some(PathBuf::from(path));
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Where log files go.
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir().join("tutor.log")
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join(DEFAULT_DB_NAME))
    }
}
