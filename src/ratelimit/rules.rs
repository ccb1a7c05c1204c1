//! Rate limiter parameters and values derived from them.

use std::time::Duration;

use crate::error::{Result, SharedBucketError};

/// Shortest pause between two attempts of a blocking acquire.
pub const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(10);
/// Longest pause between two attempts of a blocking acquire.
pub const MAX_RETRY_INTERVAL: Duration = Duration::from_millis(100);
/// Lower bound on the expiry of a bucket key.
pub const MIN_BUCKET_TTL: Duration = Duration::from_secs(60);
/// Bucket keys live for this many refresh periods at least.
const TTL_PERIODS: u32 = 3;

/// Validated token bucket parameters.
///
/// `max_release_count` permits are released every `refresh_period`, up to
/// `capacity` permits held at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    capacity: u64,
    max_release_count: u64,
    refresh_period: Duration,
}

impl RateLimiterConfig {
    /// Create a configuration, rejecting zero values.
    pub fn new(capacity: u64, max_release_count: u64, refresh_period: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(SharedBucketError::Config(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if max_release_count == 0 {
            return Err(SharedBucketError::Config(
                "max release count must be greater than zero".to_string(),
            ));
        }
        if refresh_period.is_zero() {
            return Err(SharedBucketError::Config(
                "refresh period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            max_release_count,
            refresh_period,
        })
    }

    /// Maximum number of tokens the bucket holds.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Permits released per refresh period.
    pub fn max_release_count(&self) -> u64 {
        self.max_release_count
    }

    /// Period over which `max_release_count` permits are released.
    pub fn refresh_period(&self) -> Duration {
        self.refresh_period
    }

    /// Continuous refill rate.
    pub fn tokens_per_second(&self) -> f64 {
        self.max_release_count as f64 / self.refresh_period.as_secs_f64()
    }

    /// Expiry applied to the bucket key on every attempt.
    ///
    /// At least three refresh periods and never under a minute, rounded up
    /// to whole seconds, so an evicted key was due to be full anyway.
    pub fn bucket_ttl(&self) -> Duration {
        let ttl = self
            .refresh_period
            .saturating_mul(TTL_PERIODS)
            .max(MIN_BUCKET_TTL);
        let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        Duration::from_secs(secs)
    }

    /// Pause between attempts while waiting for `permits`.
    ///
    /// Proportional to the time `permits` take to accrue, clamped to
    /// 10ms..=100ms.
    pub fn retry_interval(&self, permits: u64) -> Duration {
        let millis = self.refresh_period.as_millis() * u128::from(permits)
            / u128::from(self.max_release_count);
        let millis = millis.clamp(
            MIN_RETRY_INTERVAL.as_millis(),
            MAX_RETRY_INTERVAL.as_millis(),
        );
        Duration::from_millis(millis as u64)
    }
}
