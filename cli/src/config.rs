//! Layered CLI configuration.
//!
//! Precedence, lowest first: built-in defaults, the config file, then
//! `PLAYGROUND_*` environment variables (`__` separates nested keys, e.g.
//! `PLAYGROUND_TRACKER__MAX_ATTEMPTS=8`). Command-line flags are applied
//! by the caller on top of the loaded value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use playground_tracker::TrackerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "PLAYGROUND";
const HOME_ENV: &str = "PLAYGROUND_HOME";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at path: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to encode configuration defaults: {0}")]
    Defaults(#[from] serde_json::Error),

    #[error("invalid configuration value: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaygroundConfig {
    /// Kubeconfig path; unset means `$KUBECONFIG` or `~/.kube/config`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context; unset means the current context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default)]
    pub tracker: TrackerSettings,
}

/// Timeouts and retry bounds for tracker operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSettings {
    #[serde(default = "default_mutate_timeout_secs")]
    pub mutate_timeout_secs: u64,

    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_mutate_timeout_secs() -> u64 {
    30
}
fn default_read_timeout_secs() -> u64 {
    10
}
fn default_max_attempts() -> usize {
    5
}
fn default_initial_backoff_ms() -> u64 {
    50
}
fn default_max_backoff_ms() -> u64 {
    1000
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            mutate_timeout_secs: default_mutate_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl TrackerSettings {
    pub fn to_tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            mutate_timeout: Duration::from_secs(self.mutate_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

impl PlaygroundConfig {
    pub fn validate(&self) -> Result<()> {
        let tracker = &self.tracker;
        if tracker.mutate_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "tracker.mutate_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if tracker.read_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "tracker.read_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if tracker.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "tracker.max_attempts must be at least 1".to_string(),
            ));
        }
        if tracker.initial_backoff_ms > tracker.max_backoff_ms {
            return Err(ConfigError::Validation(format!(
                "tracker.initial_backoff_ms ({}) exceeds tracker.max_backoff_ms ({})",
                tracker.initial_backoff_ms, tracker.max_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Builds a [`PlaygroundConfig`] from its layers.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_overrides: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this file instead of the default location. The file must exist.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Read environment overrides from `vars` instead of the process
    /// environment.
    pub fn with_env_overrides(mut self, vars: HashMap<String, String>) -> Self {
        self.env_overrides = Some(vars);
        self
    }

    pub fn load(&self) -> Result<PlaygroundConfig> {
        let defaults = serde_json::to_string(&PlaygroundConfig::default())?;
        let mut builder =
            Config::builder().add_source(File::from_str(&defaults, FileFormat::Json));

        match &self.config_path {
            Some(path) if path.exists() => {
                builder = builder.add_source(File::from(path.as_path()));
            }
            Some(path) => return Err(ConfigError::FileNotFound(path.clone())),
            None => {
                if let Some(path) = Self::find_config_file() {
                    tracing::debug!("Using config file {}", path.display());
                    builder = builder.add_source(File::from(path.as_path()));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env_overrides.clone()),
        );

        let config: PlaygroundConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// `$PLAYGROUND_HOME/config.toml`, else `~/.playground/config.toml`,
    /// whichever exists.
    pub fn find_config_file() -> Option<PathBuf> {
        let home = std::env::var_os(HOME_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".playground")))?;
        let path = home.join(CONFIG_FILE_NAME);
        path.exists().then_some(path)
    }
}
