//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.
//!
//! The resulting [`Config`] is built once at startup and handed to the
//! record store, ingestor and aggregator explicitly.

use crate::ingest::MetricsTimezone;
use crate::storage::SyncMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `visits.ndjson` and `downloads.ndjson`
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default)]
    pub sync_mode: SyncMode,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("data").join("logs")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            sync_mode: SyncMode::default(),
        }
    }
}

impl StorageConfig {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            ..Default::default()
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

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Root directory for static assets served on unknown paths
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5174
}

fn default_max_body_size() -> usize {
    512 * 1024 // 512 KB
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
            static_dir: default_static_dir(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings that affect how events are dated and summarized
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Timezone used to derive the local date of each event
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "Asia/Seoul".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl MetricsConfig {
    /// Parse the configured timezone
    pub fn timezone(&self) -> Result<MetricsTimezone, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` (for development) or `json` (for production)
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

        Self::from_toml(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
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
        // Try default config locations
        let config_paths = [
            dirs::config_dir().map(|p| p.join("footfall").join("config.toml")),
            Some(PathBuf::from("/etc/footfall/config.toml")),
            Some(PathBuf::from("./footfall.toml")),
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

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Check the values the server cannot start without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "api.host",
                reason: "must not be empty".to_string(),
            });
        }
        if self.api.max_body_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "api.max_body_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.metrics.timezone().map(|_| ())
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key/value source
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Storage overrides
        if let Some(log_dir) = lookup("FOOTFALL_LOG_DIR") {
            self.storage.log_dir = PathBuf::from(log_dir);
        }
        if let Some(mode) = lookup("FOOTFALL_SYNC_MODE") {
            match mode.parse() {
                Ok(m) => self.storage.sync_mode = m,
                Err(e) => tracing::warn!("Ignoring FOOTFALL_SYNC_MODE: {}", e),
            }
        }

        // API overrides
        if let Some(host) = lookup("HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!("Ignoring invalid PORT value {:?}", port),
            }
        }
        if let Some(size) = lookup("FOOTFALL_MAX_BODY_BYTES") {
            match size.parse() {
                Ok(s) => self.api.max_body_size = s,
                Err(_) => tracing::warn!("Ignoring invalid FOOTFALL_MAX_BODY_BYTES value {:?}", size),
            }
        }
        if let Some(static_dir) = lookup("FOOTFALL_STATIC_DIR") {
            self.api.static_dir = PathBuf::from(static_dir);
        }

        // Metrics overrides
        if let Some(tz) = lookup("METRICS_TZ") {
            self.metrics.timezone = tz;
        }

        // Logging overrides
        if let Some(level) = lookup("FOOTFALL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("FOOTFALL_LOG_FORMAT") {
            self.logging.format = format;
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

    #[error("Unknown timezone '{0}' (expected an IANA name, UTC, local or an offset like +09:00)")]
    InvalidTimezone(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Footfall Configuration
#
# Environment variables override these settings:
# - HOST, PORT
# - METRICS_TZ
# - FOOTFALL_LOG_DIR, FOOTFALL_SYNC_MODE
# - FOOTFALL_MAX_BODY_BYTES, FOOTFALL_STATIC_DIR
# - FOOTFALL_LOG_LEVEL, FOOTFALL_LOG_FORMAT

[storage]
# Directory for visits.ndjson and downloads.ndjson
log_dir = "data/logs"

# fsync after each append: "none" or "every_write"
sync_mode = "none"

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 5174

# Largest accepted request body (bytes)
max_body_size = 524288

# Directory served for non-API paths
static_dir = "."

[metrics]
# Timezone used to assign each event to a calendar day.
# IANA name ("Asia/Seoul"), "UTC", "local", or an offset like "+09:00"
timezone = "Asia/Seoul"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
