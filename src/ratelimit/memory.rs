//! In-process bucket store.
//!
//! Holds every bucket behind one mutex so each consume step is serialized,
//! the same guarantee Redis gives a running script. State is not shared
//! across processes. Expired buckets are swept from inside `try_consume`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::backend::BucketStore;
use super::bucket::{BucketState, ConsumeRequest};
use crate::error::Result;

/// Expired entries are swept once every this many consume calls.
pub const SWEEP_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct Entry {
    state: BucketState,
    /// Expiry on the caller clock, in ms
    expires_at_ms: i64,
}

/// A bucket store living in the current process.
#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    buckets: Mutex<HashMap<String, Entry>>,
    consumes: AtomicU64,
}

impl MemoryBucketStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the persisted state of a key as seen at `now_ms`.
    ///
    /// Returns `None` if the key was never written or has expired.
    pub fn peek(&self, key: &str, now_ms: i64) -> Option<BucketState> {
        let buckets = self.buckets.lock();
        buckets
            .get(key)
            .filter(|entry| entry.expires_at_ms > now_ms)
            .map(|entry| entry.state)
    }

    /// Overwrite the state of a key.
    pub fn insert(&self, key: &str, state: BucketState, ttl_secs: u64) {
        let mut buckets = self.buckets.lock();
        buckets.insert(
            key.to_string(),
            Entry {
                state,
                expires_at_ms: expiry(state.last_update_ms, ttl_secs),
            },
        );
    }

    /// Drop every entry that has expired by `now_ms`.
    pub fn evict_expired(&self, now_ms: i64) -> usize {
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, entry| entry.expires_at_ms > now_ms);
        before - buckets.len()
    }

    /// Get the number of stored buckets, expired or not.
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Whether the store holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn expiry(now_ms: i64, ttl_secs: u64) -> i64 {
    now_ms.saturating_add((ttl_secs as i64).saturating_mul(1000))
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn try_consume(&self, request: &ConsumeRequest) -> Result<bool> {
        let mut buckets = self.buckets.lock();

        let current = buckets
            .get(&request.key)
            .filter(|entry| entry.expires_at_ms > request.now_ms)
            .map(|entry| entry.state);

        let (state, decision) = BucketState::consume(
            current,
            request.capacity,
            request.rate_per_second,
            request.requested,
            request.now_ms,
        );

        buckets.insert(
            request.key.clone(),
            Entry {
                state,
                expires_at_ms: expiry(request.now_ms, request.ttl_secs),
            },
        );

        if self.consumes.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            let before = buckets.len();
            buckets.retain(|_, entry| entry.expires_at_ms > request.now_ms);
            debug!(evicted = before - buckets.len(), "Swept expired buckets");
        }

        trace!(
            key = %request.key,
            tokens = state.tokens,
            admitted = decision.is_admitted(),
            "Consumed from in-memory bucket"
        );

        Ok(decision.is_admitted())
    }
}
