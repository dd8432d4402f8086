//! Admission control.
//!
//! A counting semaphore with FIFO waiters.  `run` wraps one asynchronous
//! operation; at any instant no more than `limit` operations started through
//! the limiter are executing.  The permit is an RAII guard: a slot is
//! released exactly once per acquisition on every exit path, and an operation
//! that fails never leaks a held slot.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use scribe_domain::error::{Error, Result};

#[derive(Clone)]
pub struct AdmissionLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl AdmissionLimiter {
    /// `limit` is fixed for the lifetime of the limiter.  A non-positive
    /// value is clamped to 1 so a bad config can never stall the pipeline.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Free slots right now (test instrumentation).
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Execute `op` once a slot frees, returning its result.  Saturated
    /// callers queue in arrival order; completing (or failing) wakes
    /// exactly the next queued waiter.
    pub async fn run<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::Other("admission limiter closed".into()))?;
        op.await
    }
}
