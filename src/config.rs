//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::RetryPolicy;
use crate::datasource::DataSourceSettings;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub datasource: DataSourceConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// IoT Central application settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataSourceConfig {
    /// Application URL (scheme optional)
    #[serde(default)]
    pub app_url: String,

    /// API token for the `Authorization` header
    #[serde(default)]
    pub api_token: String,

    /// Optional per-call HTTP timeout
    pub request_timeout_secs: Option<u64>,
}

/// Throttling retry settings
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_min_backoff")]
    pub min_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Fixed jitter seed, for reproducible runs
    pub seed: Option<u64>,
}

fn default_max_attempts() -> u32 {
    4
}

fn default_min_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_backoff_ms: default_min_backoff(),
            max_backoff_ms: default_max_backoff(),
            seed: None,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            min_backoff: Duration::from_millis(self.min_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("iotc-datasource").join("config.toml")),
            Some(PathBuf::from("/etc/iotc-datasource/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Datasource overrides
        if let Some(app_url) = var("IOTC_APP_URL") {
            self.datasource.app_url = app_url;
        }
        if let Some(token) = var("IOTC_API_TOKEN") {
            self.datasource.api_token = token;
        }

        // Retry overrides
        if let Some(attempts) = var("IOTC_RETRY_ATTEMPTS") {
            match attempts.parse() {
                Ok(n) => self.retry.max_attempts = n,
                Err(_) => tracing::warn!(value = %attempts, "Ignoring invalid IOTC_RETRY_ATTEMPTS"),
            }
        }

        // API overrides
        if let Some(host) = var("IOTC_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("IOTC_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid IOTC_API_PORT"),
            }
        }

        // Logging overrides
        if let Some(level) = var("IOTC_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("IOTC_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Check that the datasource can be built from this config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.datasource.app_url.trim().is_empty() {
            return Err(ConfigError::Missing("datasource.app_url"));
        }
        if self.datasource.api_token.trim().is_empty() {
            return Err(ConfigError::Missing("datasource.api_token"));
        }
        if self.retry.min_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.min_backoff_ms must not exceed retry.max_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Datasource settings derived from this config
    pub fn datasource_settings(&self) -> DataSourceSettings {
        DataSourceSettings {
            app_url: self.datasource.app_url.clone(),
            api_token: self.datasource.api_token.clone(),
            retry: self.retry.policy(),
            retry_seed: self.retry.seed,
            request_timeout: self.datasource.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# IoT Central Datasource Configuration
#
# Environment variables override these settings:
# - IOTC_APP_URL
# - IOTC_API_TOKEN
# - IOTC_RETRY_ATTEMPTS
# - IOTC_API_HOST
# - IOTC_API_PORT
# - IOTC_LOG_LEVEL
# - IOTC_LOG_FORMAT

[datasource]
# IoT Central application URL (scheme optional)
app_url = "myapp.azureiotcentral.com"

# API token, sent as the Authorization header
api_token = ""

# Optional per-call HTTP timeout in seconds
# request_timeout_secs = 30

[retry]
# Total attempts for a throttled (HTTP 429) query
max_attempts = 4

# Random backoff between attempts (ms)
min_backoff_ms = 500
max_backoff_ms = 2000

# Fixed jitter seed for reproducible runs
# seed = 42

[api]
# Bridge server host
host = "0.0.0.0"

# Bridge server port
port = 8090

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
