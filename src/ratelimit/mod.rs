//! Token bucket admission control and its backing stores.

mod backend;
mod bucket;
mod cancel;
mod clock;
mod key;
mod limiter;
mod memory;
mod redis_store;
mod rules;

pub use backend::{BucketStore, CountingStore};
pub use bucket::{BucketState, ConsumeRequest, Decision};
pub use cancel::CancelToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{LimiterKey, DEFAULT_KEY_PREFIX};
pub use limiter::RateLimiter;
pub use memory::{MemoryBucketStore, SWEEP_INTERVAL};
pub use redis_store::{RedisBucketStore, LAST_UPDATE_FIELD, TOKENS_FIELD, TOKEN_BUCKET_SCRIPT};
pub use rules::{RateLimiterConfig, MAX_RETRY_INTERVAL, MIN_BUCKET_TTL, MIN_RETRY_INTERVAL};
