//! Token bucket rate limiter facade.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace};

use super::backend::BucketStore;
use super::bucket::ConsumeRequest;
use super::cancel::CancelToken;
use super::clock::{Clock, SystemClock};
use super::key::LimiterKey;
use super::rules::RateLimiterConfig;
use crate::error::{Result, SharedBucketError};

/// A named token bucket shared through a [`BucketStore`].
///
/// The limiter holds no bucket state and takes no locks; every decision is a
/// single call into the store. It is cheap to share behind an `Arc`, and
/// several limiters in different processes pointing at the same key and
/// store share one quota. Blocked waiters are not served in any particular
/// order.
pub struct RateLimiter<S> {
    store: S,
    key: LimiterKey,
    /// Cached `key.to_store_key()`
    store_key: String,
    config: RateLimiterConfig,
    clock: Arc<dyn Clock>,
}

impl<S: BucketStore> RateLimiter<S> {
    /// Create a limiter for `name` using the wall clock.
    pub fn new(config: RateLimiterConfig, name: &str, store: S) -> Result<Self> {
        Ok(Self::with_key(
            config,
            LimiterKey::new(name)?,
            store,
            Arc::new(SystemClock),
        ))
    }

    /// Create a limiter reading time from `clock`.
    pub fn with_clock(
        config: RateLimiterConfig,
        name: &str,
        store: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self::with_key(config, LimiterKey::new(name)?, store, clock))
    }

    /// Create a limiter for an already built key.
    pub fn with_key(
        config: RateLimiterConfig,
        key: LimiterKey,
        store: S,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store_key = key.to_store_key();
        info!(
            key = %store_key,
            capacity = config.capacity(),
            tokens_per_second = config.tokens_per_second(),
            ttl_secs = config.bucket_ttl().as_secs(),
            "Rate limiter initialized"
        );

        Self {
            store,
            key,
            store_key,
            config,
            clock,
        }
    }

    /// Get the limiter key.
    pub fn key(&self) -> &LimiterKey {
        &self.key
    }

    /// Get the bucket parameters.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Get the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Expiry refreshed on the bucket key by every attempt.
    pub fn ttl(&self) -> Duration {
        self.config.bucket_ttl()
    }

    /// Pause between attempts while waiting for `permits`.
    pub fn retry_interval(&self, permits: u64) -> Duration {
        self.config.retry_interval(permits)
    }

    /// Try to take `permits` without waiting.
    ///
    /// `Ok(false)` means nothing was deducted. Requests of zero permits or of
    /// more than the capacity fail before the store is contacted. Store
    /// errors are returned as is and not retried, since the deduction may
    /// have happened server-side.
    pub async fn try_acquire(&self, permits: u64) -> Result<bool> {
        self.validate(permits)?;
        self.attempt(permits).await
    }

    /// Wait until `permits` are taken.
    ///
    /// There is no overall timeout; drop the future to stop waiting, or use
    /// [`RateLimiter::acquire_with_cancel`] for an explicit signal.
    pub async fn acquire(&self, permits: u64) -> Result<()> {
        self.validate(permits)?;
        let interval = self.retry_interval(permits);

        loop {
            if self.attempt(permits).await? {
                return Ok(());
            }
            debug!(
                key = %self.store_key,
                permits = permits,
                retry_in_ms = interval.as_millis() as u64,
                "Waiting for tokens"
            );
            tokio::time::sleep(interval).await;
        }
    }

    /// Wait until `permits` are taken or `cancel` fires.
    ///
    /// Cancellation is checked before every attempt and interrupts the pause
    /// between attempts. A cancelled acquire returns
    /// [`SharedBucketError::Cancelled`] without having taken any permits.
    pub async fn acquire_with_cancel(&self, permits: u64, cancel: &CancelToken) -> Result<()> {
        self.validate(permits)?;
        let interval = self.retry_interval(permits);

        loop {
            if cancel.is_cancelled() {
                debug!(key = %self.store_key, permits = permits, "Acquire cancelled");
                return Err(SharedBucketError::Cancelled);
            }
            if self.attempt(permits).await? {
                return Ok(());
            }
            debug!(
                key = %self.store_key,
                permits = permits,
                retry_in_ms = interval.as_millis() as u64,
                "Waiting for tokens"
            );
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    fn validate(&self, permits: u64) -> Result<()> {
        if permits == 0 || permits > self.config.capacity() {
            return Err(SharedBucketError::InvalidPermits {
                requested: permits,
                capacity: self.config.capacity(),
            });
        }
        Ok(())
    }

    async fn attempt(&self, permits: u64) -> Result<bool> {
        let request = ConsumeRequest {
            key: self.store_key.clone(),
            capacity: self.config.capacity(),
            rate_per_second: self.config.tokens_per_second(),
            requested: permits,
            now_ms: self.clock.now_ms(),
            ttl_secs: self.ttl().as_secs(),
        };

        trace!(
            key = %request.key,
            permits = permits,
            now_ms = request.now_ms,
            "Checking rate limit"
        );

        let admitted = self.store.try_consume(&request).await?;
        if !admitted {
            debug!(key = %request.key, permits = permits, "Rate limit exceeded");
        }
        Ok(admitted)
    }
}

impl<S> std::fmt::Debug for RateLimiter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("key", &self.store_key)
            .field("config", &self.config)
            .finish()
    }
}
