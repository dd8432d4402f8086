//! Self-compacting set of in-flight operations.
//!
//! The stream driver keeps submitting while older calls are still running,
//! so naive bookkeeping would grow with the total number of items processed.
//! Settled tasks are reaped on every submission, and once the set holds
//! `3 × limit` live entries the submitter waits for one completion before
//! admitting more.  Memory stays a small multiple of the concurrency limit
//! no matter how long the upstream source keeps producing.
//!
//! `JoinSet` is the completion-notification primitive here: `try_join_next`
//! reaps whatever has already settled without blocking, `join_next` parks
//! until something does.

use std::future::Future;

use tokio::task::{JoinError, JoinSet};

pub struct InFlightSet {
    tasks: JoinSet<()>,
    high_water: usize,
}

impl InFlightSet {
    pub fn new(limit: usize) -> Self {
        Self {
            tasks: JoinSet::new(),
            high_water: 3 * limit.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Admit a new operation.
    ///
    /// Reaps every settled task first; if the set is still at the high-water
    /// mark, waits for at least one outstanding operation to finish before
    /// spawning.  The set therefore never exceeds `3 × limit` entries
    /// immediately after a submission.
    pub async fn submit<F>(&mut self, operation: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reap_settled();
        while self.tasks.len() >= self.high_water {
            match self.tasks.join_next().await {
                Some(result) => log_settled(result),
                None => break,
            }
            self.reap_settled();
        }
        self.tasks.spawn(operation);
    }

    /// Await every remaining operation (end-of-stream).  Returns how many
    /// were joined.
    pub async fn drain(&mut self) -> usize {
        let mut joined = 0;
        while let Some(result) = self.tasks.join_next().await {
            log_settled(result);
            joined += 1;
        }
        joined
    }

    /// Let remaining operations run to completion unsupervised.  Used on
    /// abort: already-issued calls may still land their side effects.
    pub fn detach_all(&mut self) {
        self.tasks.detach_all();
    }

    fn reap_settled(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_settled(result);
        }
    }
}

fn log_settled(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::warn!(error = %e, "in-flight operation panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn size_never_exceeds_three_times_limit() {
        let mut set = InFlightSet::new(2);
        assert_eq!(set.high_water(), 6);

        for _ in 0..20 {
            set.submit(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
            })
            .await;
            assert!(set.len() <= 6, "set grew to {}", set.len());
        }
        set.drain().await;
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn drain_awaits_everything() {
        let mut set = InFlightSet::new(3);
        let finished = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let finished = finished.clone();
            set.submit(async move {
                tokio::time::sleep(Duration::from_millis(2)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }

        let joined = set.drain().await;
        assert_eq!(finished.load(Ordering::SeqCst), 10);
        // Some tasks may have been reaped during submission already.
        assert!(joined <= 10);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn panicking_task_is_absorbed() {
        let mut set = InFlightSet::new(1);
        set.submit(async {
            panic!("boom");
        })
        .await;
        set.submit(async {}).await;
        set.drain().await;
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn zero_limit_still_admits() {
        let mut set = InFlightSet::new(0);
        assert_eq!(set.high_water(), 3);
        set.submit(async {}).await;
        set.drain().await;
    }
}
