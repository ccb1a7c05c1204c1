//! Store trait for abstracting the shared and in-process bucket backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::bucket::ConsumeRequest;
use crate::error::Result;

/// Trait for bucket store implementations.
///
/// Implementations must run the whole refill/consume/persist sequence as one
/// indivisible unit per key; the limiter holds no lock of its own.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Attempt to take `request.requested` tokens from the bucket.
    ///
    /// Returns `Ok(true)` when the tokens were deducted. Errors are never
    /// retried by the caller since the server-side outcome is unknown.
    async fn try_consume(&self, request: &ConsumeRequest) -> Result<bool>;
}

#[async_trait]
impl<S: BucketStore + ?Sized> BucketStore for Arc<S> {
    async fn try_consume(&self, request: &ConsumeRequest) -> Result<bool> {
        (**self).try_consume(request).await
    }
}

/// Store wrapper that counts how many times the inner store was called.
#[derive(Debug)]
pub struct CountingStore<S> {
    inner: S,
    calls: AtomicUsize,
}

impl<S> CountingStore<S> {
    /// Wrap a store.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `try_consume` calls seen so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Get the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: BucketStore> BucketStore for CountingStore<S> {
    async fn try_consume(&self, request: &ConsumeRequest) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.try_consume(request).await
    }
}
