//! Token bucket state and the refill/consume step.

use serde::{Deserialize, Serialize};

/// Persisted state of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketState {
    /// Currently available permits
    pub tokens: f64,
    /// Caller wall clock (ms) of the last refill computation
    pub last_update_ms: i64,
}

/// Inputs to one admission attempt against the shared store.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumeRequest {
    /// Store key of the bucket
    pub key: String,
    /// Maximum number of tokens the bucket holds
    pub capacity: u64,
    /// Refill rate in tokens per second
    pub rate_per_second: f64,
    /// Permits to deduct
    pub requested: u64,
    /// Caller wall clock in milliseconds
    pub now_ms: i64,
    /// Rolling expiry applied to the key
    pub ttl_secs: u64,
}

/// Outcome of a single consume step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Deny,
}

impl Decision {
    /// Whether the request was admitted.
    pub fn is_admitted(self) -> bool {
        matches!(self, Decision::Admit)
    }

    /// Wire form returned by the store script.
    pub fn to_flag(self) -> i64 {
        match self {
            Decision::Admit => 1,
            Decision::Deny => 0,
        }
    }
}

impl BucketState {
    /// State of a key that has never been written.
    pub fn full(capacity: u64, now_ms: i64) -> Self {
        Self {
            tokens: capacity as f64,
            last_update_ms: now_ms,
        }
    }

    /// Refill for the elapsed time, then try to take `requested` tokens.
    ///
    /// The returned state always carries `now_ms` and the refilled balance,
    /// whether or not the request was admitted. Time going backwards counts
    /// as zero elapsed.
    pub fn consume(
        state: Option<BucketState>,
        capacity: u64,
        rate_per_second: f64,
        requested: u64,
        now_ms: i64,
    ) -> (BucketState, Decision) {
        let state = state.unwrap_or_else(|| Self::full(capacity, now_ms));
        let capacity = capacity as f64;

        let elapsed_ms = (now_ms - state.last_update_ms).max(0) as f64;
        let refill = elapsed_ms * rate_per_second / 1000.0;
        let mut tokens = (state.tokens + refill).min(capacity);

        let requested = requested as f64;
        let decision = if tokens >= requested {
            tokens -= requested;
            Decision::Admit
        } else {
            Decision::Deny
        };

        (
            BucketState {
                tokens,
                last_update_ms: now_ms,
            },
            decision,
        )
    }
}
