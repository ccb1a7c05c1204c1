//! Sharedbucket - Distributed Token Bucket Rate Limiting
//!
//! This crate implements a token bucket rate limiter whose state lives in a
//! shared Redis instance, so any number of processes can draw from one
//! quota. Every admission decision runs as a single server-side script; the
//! client keeps no bucket state and takes no locks.

pub mod config;
pub mod error;
pub mod ratelimit;

pub use error::{Result, SharedBucketError};
pub use ratelimit::{CancelToken, RateLimiter, RateLimiterConfig};
