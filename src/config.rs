use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DB_IDLE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 8;
const DEFAULT_NEAR_EXPIRY_WINDOW_DAYS: i64 = 7;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Application configuration, layered from `config/default.toml`, an optional
/// per-environment file and `APP__`-prefixed environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Deployment environment name ("development", "test", "production")
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Default log level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Window used by the near-expiry scan when the caller does not pass one
    #[validate(range(min = 1, max = 365))]
    #[serde(default = "default_near_expiry_window_days")]
    pub near_expiry_window_days: i64,

    /// Capacity of the domain event channel
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl AppConfig {
    /// Minimal constructor, mainly for tests and embedding callers.
    pub fn new(database_url: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            environment: environment.into(),
            log_level: default_log_level(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            near_expiry_window_days: default_near_expiry_window_days(),
            event_buffer_size: default_event_buffer_size(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == DEFAULT_ENV
    }
}

/// Load and validate the layered configuration.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder();

    let default_file = format!("{}/default", CONFIG_DIR);
    if Path::new(&format!("{}.toml", default_file)).exists() {
        builder = builder.add_source(File::with_name(&default_file));
    }
    let env_file = format!("{}/{}", CONFIG_DIR, environment);
    if Path::new(&format!("{}.toml", env_file)).exists() {
        builder = builder.add_source(File::with_name(&env_file).required(false));
    }
    builder = builder.add_source(Environment::with_prefix("APP").separator("__"));

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

    info!(environment = %cfg.environment, "configuration loaded");
    Ok(cfg)
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

fn default_db_min_connections() -> u32 {
    DEFAULT_DB_MIN_CONNECTIONS
}

fn default_db_connect_timeout_secs() -> u64 {
    DEFAULT_DB_CONNECT_TIMEOUT_SECS
}

fn default_db_idle_timeout_secs() -> u64 {
    DEFAULT_DB_IDLE_TIMEOUT_SECS
}

fn default_db_acquire_timeout_secs() -> u64 {
    DEFAULT_DB_ACQUIRE_TIMEOUT_SECS
}

fn default_near_expiry_window_days() -> i64 {
    DEFAULT_NEAR_EXPIRY_WINDOW_DAYS
}

fn default_event_buffer_size() -> usize {
    DEFAULT_EVENT_BUFFER_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_defaults() {
        let cfg = AppConfig::new("sqlite::memory:", "test");
        assert_eq!(cfg.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
        assert_eq!(cfg.near_expiry_window_days, DEFAULT_NEAR_EXPIRY_WINDOW_DAYS);
        assert!(!cfg.is_development());
    }

    #[test]
    fn validation_rejects_zero_window() {
        let mut cfg = AppConfig::new("sqlite::memory:", "test");
        cfg.near_expiry_window_days = 0;
        assert!(cfg.validate().is_err());
    }
}
