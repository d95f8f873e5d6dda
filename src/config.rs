//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//! 1. `DATABASE_URL` / `REDIS_URL` (conventional deployment overrides)
//! 2. Environment variables (prefix: INVENTORY_, nested keys split on `__`)
//! 3. Current working directory: ./inventory.toml
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Redis configuration (used by the distributed rate limiter)
    pub redis: RedisConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON instead of human-readable lines
    #[serde(default = "default_log_json")]
    pub log_json: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            port: default_port(),
            log_level: default_log_level(),
            log_json: default_log_json(),
            timeout_secs: default_timeout(),
            body_limit_mb: default_body_limit_mb(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum idle connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Maximum retry attempts for establishing database connection
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_secs: default_connection_timeout(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: usize,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Maximum retry attempts for establishing Redis connection
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            max_connections: default_redis_max_connections(),
            connection_timeout_secs: default_connection_timeout(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Limiter strategy: "local" (in-process token bucket) or "redis"
    /// (fixed-window counter shared across instances)
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Sustained refill rate for the token bucket, in requests per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Token bucket capacity (maximum burst)
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,

    /// Requests allowed per window for the Redis strategy
    #[serde(default = "default_per_window")]
    pub per_window: u32,

    /// Fixed window length in seconds for the Redis strategy
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
            per_window: default_per_window(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "inventory-service".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_json() -> bool {
    false
}

fn default_timeout() -> u64 {
    30
}

fn default_body_limit_mb() -> usize {
    10 // 10 MB
}

fn default_database_url() -> String {
    "postgres://localhost:5432/inventory".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_redis_max_connections() -> usize {
    16
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1
}

fn default_strategy() -> String {
    "local".to_string()
}

fn default_requests_per_second() -> u32 {
    1
}

fn default_burst_size() -> u32 {
    5
}

fn default_per_window() -> u32 {
    60
}

fn default_window_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Environment variables (INVENTORY_ prefix) override the config file,
    /// which overrides the defaults. `DATABASE_URL` and `REDIS_URL` take
    /// precedence over everything since deployment platforms inject them.
    pub fn load() -> Result<Self> {
        Self::load_from("inventory.toml")
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &str) -> Result<Self> {
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("INVENTORY_").split("__"))
            .extract()?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            config.redis.url = url;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.port, 8080);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.redis.url, "redis://localhost:6379/0");
    }

    #[test]
    fn test_default_rate_limit_is_local_token_bucket() {
        let config = RateLimitConfig::default();
        assert_eq!(config.strategy, "local");
        assert_eq!(config.requests_per_second, 1);
        assert_eq!(config.burst_size, 5);
        assert_eq!(config.window_secs, 60);
    }

    #[test]
    fn test_load_applies_env_overrides() {
        std::env::set_var("INVENTORY_SERVICE__PORT", "9999");
        std::env::set_var("DATABASE_URL", "postgres://db.internal:5432/items");

        let config = Config::load().expect("config should load");
        assert_eq!(config.service.port, 9999);
        assert_eq!(config.database.url, "postgres://db.internal:5432/items");

        std::env::remove_var("INVENTORY_SERVICE__PORT");
        std::env::remove_var("DATABASE_URL");
    }
}
