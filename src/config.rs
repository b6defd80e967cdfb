//! Layered configuration.
//!
//! Sources, later overriding earlier:
//! 1. Built-in defaults (`<data dir>/moss/moss.db`, level `info`, no timeout)
//! 2. YAML file: `--config <path>` or `<config dir>/moss/config.yaml`
//! 3. Environment: `MOSS_DB`, `MOSS_LOG`, `MOSS_CALL_TIMEOUT_MS`
//! 4. Command-line overrides

use crate::call::CallContext;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const ENV_DB: &str = "MOSS_DB";
pub const ENV_LOG: &str = "MOSS_LOG";
pub const ENV_CALL_TIMEOUT_MS: &str = "MOSS_CALL_TIMEOUT_MS";

const CONFIG_FILE_NAME: &str = "config.yaml";
const APP_DIR: &str = "moss";

/// Errors raised while assembling configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Resolved runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MossConfig {
    pub db_path: PathBuf,
    /// `tracing` filter directive, e.g. `info` or `moss=debug`
    pub log_level: String,
    /// Deadline applied to every call made through an adapter
    pub call_timeout_ms: Option<u64>,
}

impl Default for MossConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: "info".to_string(),
            call_timeout_ms: None,
        }
    }
}

impl MossConfig {
    /// A fresh call context carrying the configured deadline, if any
    pub fn call_context(&self) -> CallContext {
        match self.call_timeout_ms {
            Some(ms) => CallContext::background().with_timeout(Duration::from_millis(ms)),
            None => CallContext::background(),
        }
    }

    fn apply(&mut self, layer: ConfigLayer) {
        if let Some(db_path) = layer.db_path {
            self.db_path = db_path;
        }
        if let Some(log_level) = layer.log_level {
            self.log_level = log_level;
        }
        if layer.call_timeout_ms.is_some() {
            self.call_timeout_ms = layer.call_timeout_ms;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        EnvFilter::try_new(&self.log_level)
            .map_err(|e| ConfigError::invalid_value("log_level", e.to_string()))?;
        if self.call_timeout_ms == Some(0) {
            return Err(ConfigError::invalid_value("call_timeout_ms", "must be greater than zero"));
        }
        Ok(())
    }
}

/// One partial source of settings; also the on-disk YAML shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub call_timeout_ms: Option<u64>,
}

impl ConfigLayer {
    fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let call_timeout_ms = match lookup(ENV_CALL_TIMEOUT_MS) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::invalid_value(ENV_CALL_TIMEOUT_MS, e.to_string()))?,
            ),
            None => None,
        };
        Ok(Self {
            db_path: lookup(ENV_DB).filter(|v| !v.is_empty()).map(PathBuf::from),
            log_level: lookup(ENV_LOG).filter(|v| !v.is_empty()),
            call_timeout_ms,
        })
    }
}

/// Builds a `MossConfig` from defaults, file, environment and overrides.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// File named on the command line; must exist when given
    explicit_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit_file: Some(path.into()),
        }
    }

    /// Load using the process environment.
    pub fn load(&self, overrides: ConfigLayer) -> Result<MossConfig, ConfigError> {
        self.load_with_env(overrides, |key| std::env::var(key).ok())
    }

    pub fn load_with_env(
        &self,
        overrides: ConfigLayer,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<MossConfig, ConfigError> {
        let mut config = MossConfig::default();

        if let Some(file) = self.file_layer()? {
            config.apply(file);
        }
        config.apply(ConfigLayer::from_env(env)?);
        config.apply(overrides);

        config.validate()?;
        Ok(config)
    }

    fn file_layer(&self) -> Result<Option<ConfigLayer>, ConfigError> {
        if let Some(path) = &self.explicit_file {
            return load_config_file(path).map(Some);
        }
        match default_config_path() {
            Some(path) if path.exists() => load_config_file(&path).map(Some),
            _ => Ok(None),
        }
    }
}

/// `<data dir>/moss/moss.db`, falling back to `~/.local/share`
pub fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join(APP_DIR).join("moss.db")
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
}

fn load_config_file(path: &Path) -> Result<ConfigLayer, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
