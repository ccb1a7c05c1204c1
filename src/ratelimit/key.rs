//! Store key generation for named limiters.

use crate::error::{Result, SharedBucketError};

/// Default namespace for limiter keys.
pub const DEFAULT_KEY_PREFIX: &str = "rate-limiter";

/// A key that uniquely identifies a limiter's bucket in the shared store.
///
/// The key is the namespace and the limiter name joined by a colon, so it
/// stays stable across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LimiterKey {
    /// Namespace the limiter lives in
    pub prefix: String,
    /// Human-readable limiter name
    pub name: String,
}

impl LimiterKey {
    /// Create a key in the default namespace.
    pub fn new(name: &str) -> Result<Self> {
        Self::with_prefix(DEFAULT_KEY_PREFIX, name)
    }

    /// Create a key in a custom namespace.
    pub fn with_prefix(prefix: &str, name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SharedBucketError::Config(
                "limiter name must not be blank".to_string(),
            ));
        }

        let prefix = prefix.trim().trim_end_matches(':');
        if prefix.is_empty() {
            return Err(SharedBucketError::Config(
                "key prefix must not be blank".to_string(),
            ));
        }

        Ok(Self {
            prefix: prefix.to_string(),
            name: name.to_string(),
        })
    }

    /// Convert the key to the string stored in Redis.
    pub fn to_store_key(&self) -> String {
        format!("{}:{}", self.prefix, self.name)
    }
}

impl std::fmt::Display for LimiterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_store_key())
    }
}
