use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::sync::{RemoteOptions, DEFAULT_API_URL, DEFAULT_REMOTE_PATH, DEFAULT_TIMEOUT};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    fn set(&mut self, value: T, source: ConfigSource) {
        self.value = value;
        self.source = source;
    }
}

/// Application configuration with source tracking.
///
/// Repository owner, name and token are not part of it: they live in the
/// `sync_config` record next to the catalog so they can be changed at runtime.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding distributors.json, coffees.json and sync_config.json
    pub data_dir: ConfigValue<PathBuf>,
    /// Base URL of the GitHub REST API
    pub api_url: ConfigValue<String>,
    /// Path of the mirror file inside the repository
    pub remote_path: ConfigValue<String>,
    /// Per-request timeout for remote calls, in seconds
    pub request_timeout_secs: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    api_url: Option<String>,
    remote_path: Option<String>,
    request_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut api_url = ConfigValue::new(DEFAULT_API_URL.to_string(), ConfigSource::Default);
        let mut remote_path =
            ConfigValue::new(DEFAULT_REMOTE_PATH.to_string(), ConfigSource::Default);
        let mut request_timeout_secs =
            ConfigValue::new(DEFAULT_TIMEOUT.as_secs(), ConfigSource::Default);
        let mut config_file = None;

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir.set(resolved, ConfigSource::File);
            }
            if let Some(url) = file_config.api_url {
                api_url.set(url, ConfigSource::File);
            }
            if let Some(remote) = file_config.remote_path {
                remote_path.set(remote, ConfigSource::File);
            }
            if let Some(secs) = file_config.request_timeout_secs {
                request_timeout_secs.set(secs, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(dir) = std::env::var("LATEBASE_DATA_DIR") {
            data_dir.set(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("LATEBASE_API_URL") {
            api_url.set(url, ConfigSource::Environment);
        }
        if let Ok(remote) = std::env::var("LATEBASE_REMOTE_PATH") {
            remote_path.set(remote, ConfigSource::Environment);
        }
        if let Ok(raw) = std::env::var("LATEBASE_REQUEST_TIMEOUT") {
            let secs = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("LATEBASE_REQUEST_TIMEOUT", raw.clone()))?;
            request_timeout_secs.set(secs, ConfigSource::Environment);
        }

        Ok(Self {
            data_dir,
            api_url,
            remote_path,
            request_timeout_secs,
            config_file,
        })
    }

    /// Options for the remote mirror client.
    pub fn remote_options(&self) -> RemoteOptions {
        RemoteOptions {
            api_url: self.api_url.value.trim_end_matches('/').to_string(),
            path: self.remote_path.value.trim_matches('/').to_string(),
            timeout: Duration::from_secs(self.request_timeout_secs.value.max(1)),
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/latebase/
    /// - macOS: ~/Library/Application Support/latebase/
    /// - Windows: %APPDATA%/latebase/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("latebase")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/latebase/
    /// - macOS: ~/Library/Application Support/latebase/
    /// - Windows: %APPDATA%/latebase/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("latebase")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
