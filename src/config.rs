//! Configuration management for sharedbucket.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SharedBucketError};
use crate::ratelimit::{LimiterKey, RateLimiterConfig, DEFAULT_KEY_PREFIX};

/// Prefix of environment variables overriding file settings.
pub const ENV_PREFIX: &str = "SHAREDBUCKET";

/// Main configuration for sharedbucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedBucketConfig {
    /// Shared store connection
    #[serde(default)]
    pub redis: RedisConfig,

    /// Limiter parameters
    #[serde(default)]
    pub limiter: LimiterSettings,
}

/// Redis connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

/// Raw limiter settings, validated by [`LimiterSettings::to_rate_limiter_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterSettings {
    /// Limiter name, unique per shared quota
    #[serde(default = "default_name")]
    pub name: String,

    /// Namespace of the store key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Maximum tokens held at once
    #[serde(default = "default_capacity")]
    pub capacity: u64,

    /// Tokens released per refresh period
    #[serde(default = "default_capacity")]
    pub max_release_count: u64,

    /// Refresh period in milliseconds
    #[serde(default = "default_refresh_period_ms")]
    pub refresh_period_ms: u64,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            key_prefix: default_key_prefix(),
            capacity: default_capacity(),
            max_release_count: default_capacity(),
            refresh_period_ms: default_refresh_period_ms(),
        }
    }
}

fn default_name() -> String {
    "default".to_string()
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_capacity() -> u64 {
    10
}

fn default_refresh_period_ms() -> u64 {
    1000
}

impl LimiterSettings {
    /// Validate into bucket parameters.
    pub fn to_rate_limiter_config(&self) -> Result<RateLimiterConfig> {
        RateLimiterConfig::new(
            self.capacity,
            self.max_release_count,
            Duration::from_millis(self.refresh_period_ms),
        )
    }

    /// Build the store key for this limiter.
    pub fn key(&self) -> Result<LimiterKey> {
        LimiterKey::with_prefix(&self.key_prefix, &self.name)
    }
}

impl SharedBucketConfig {
    /// Load configuration from an optional file, then the environment.
    ///
    /// Environment variables look like `SHAREDBUCKET__LIMITER__CAPACITY=20`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SharedBucketError::Config(format!("Failed to load configuration: {}", e)))
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| SharedBucketError::Config(format!("Failed to parse configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SharedBucketConfig::default();
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
        assert_eq!(config.limiter.key().unwrap().to_store_key(), "rate-limiter:default");

        let rl = config.limiter.to_rate_limiter_config().unwrap();
        assert_eq!(rl.capacity(), 10);
        assert_eq!(rl.tokens_per_second(), 10.0);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
redis:
  url: redis://cache:6380/1
limiter:
  name: payments
  capacity: 50
  max_release_count: 5
  refresh_period_ms: 500
"#;
        let config = SharedBucketConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.redis.url, "redis://cache:6380/1");
        assert_eq!(config.limiter.name, "payments");
        assert_eq!(config.limiter.key_prefix, "rate-limiter");

        let rl = config.limiter.to_rate_limiter_config().unwrap();
        assert_eq!(rl.capacity(), 50);
        assert_eq!(rl.refresh_period(), Duration::from_millis(500));
        assert_eq!(rl.tokens_per_second(), 10.0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let yaml = r#"
limiter:
  capacity: 0
"#;
        let config = SharedBucketConfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            config.limiter.to_rate_limiter_config(),
            Err(SharedBucketError::Config(_))
        ));
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(SharedBucketConfig::from_yaml("limiter: [").is_err());
    }

    #[test]
    fn test_environment_overrides() {
        std::env::set_var("SBTEST_ENV__LIMITER__NAME", "from-env");
        std::env::set_var("SBTEST_ENV__LIMITER__CAPACITY", "42");

        let config = SharedBucketConfig::load_with_prefix(None, "SBTEST_ENV").unwrap();
        assert_eq!(config.limiter.name, "from-env");
        assert_eq!(config.limiter.capacity, 42);
        assert_eq!(config.limiter.refresh_period_ms, 1000);

        std::env::remove_var("SBTEST_ENV__LIMITER__NAME");
        std::env::remove_var("SBTEST_ENV__LIMITER__CAPACITY");
    }
}
