//! Error types for sharedbucket.

use thiserror::Error;

/// Main error type for sharedbucket operations.
#[derive(Error, Debug)]
pub enum SharedBucketError {
    /// Invalid limiter construction or unparsable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request that can never be admitted by this bucket
    #[error("Invalid permit request: requested {requested}, capacity {capacity}")]
    InvalidPermits {
        /// Permits asked for
        requested: u64,
        /// Capacity of the bucket
        capacity: u64,
    },

    /// A blocking acquire was cancelled while waiting
    #[error("Acquire cancelled")]
    Cancelled,

    /// Network or script execution failure against the shared store
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// The store answered with something other than an admit/deny flag
    #[error("Unexpected store reply: {0}")]
    UnexpectedReply(String),
}

impl SharedBucketError {
    /// Whether this error came from the shared store rather than the caller.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store(_) | Self::UnexpectedReply(_))
    }
}

/// Result type alias for sharedbucket operations.
pub type Result<T> = std::result::Result<T, SharedBucketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_permits_message() {
        let err = SharedBucketError::InvalidPermits {
            requested: 11,
            capacity: 10,
        };
        assert_eq!(
            err.to_string(),
            "Invalid permit request: requested 11, capacity 10"
        );
        assert!(!err.is_store_error());
    }

    #[test]
    fn test_store_error_classification() {
        let redis_err = redis::RedisError::from((redis::ErrorKind::IoError, "connection reset"));
        assert!(SharedBucketError::from(redis_err).is_store_error());
        assert!(SharedBucketError::UnexpectedReply("nil".to_string()).is_store_error());
        assert!(!SharedBucketError::Cancelled.is_store_error());
    }
}
