//! Bulkhead: bound the number of operations running at once.
//!
//! Unlike a plain semaphore the bulkhead tracks how many permits are in use,
//! and hands out owned permits so work moved onto spawned tasks stays bounded.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Bulkhead error.
#[derive(Debug)]
pub enum BulkheadError<E> {
    /// The bulkhead was closed and no longer grants permits.
    Closed,
    /// The operation itself failed.
    Execution(E),
}

impl<E: std::fmt::Display> std::fmt::Display for BulkheadError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "bulkhead is closed"),
            Self::Execution(e) => write!(f, "execution failed: {}", e),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for BulkheadError<E> {}

/// Concurrency limiter.
#[derive(Debug)]
pub struct Bulkhead {
    name: String,
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
    total_calls: AtomicU64,
}

impl Bulkhead {
    /// Create a bulkhead allowing `max_concurrent` holders at once (minimum 1).
    pub fn new(name: impl Into<String>, max_concurrent: usize) -> Arc<Self> {
        let max_concurrent = max_concurrent.max(1);
        let name = name.into();
        debug!(name = %name, max_concurrent, "bulkhead initialized");

        Arc::new(Self {
            name,
            max_concurrent,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            total_calls: AtomicU64::new(0),
        })
    }

    /// Bulkhead name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured limit.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Permits currently held.
    pub fn active_count(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    /// Permits acquired since creation.
    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    /// Wait for a permit that can be moved into a spawned task.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        Some(permit)
    }

    /// Run `f` while holding a permit.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, BulkheadError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let _permit = self.acquire().await.ok_or(BulkheadError::Closed)?;
        f().await.map_err(BulkheadError::Execution)
    }

    /// Stop granting permits; pending and future acquisitions fail.
    pub fn close(&self) {
        self.semaphore.close();
    }
}
