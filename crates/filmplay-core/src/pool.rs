//! Bounded-concurrency worker pool
//!
//! Caps how many backend calls are outstanding at once. Each pool is an
//! owned value; pipelines that must share a bound share the same instance.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Default number of concurrent tasks
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Semaphore-backed limiter for async tasks
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl WorkerPool {
    /// Create a pool allowing `concurrency` tasks in flight (at least one)
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Run `task` once a slot is free
    ///
    /// Tasks queue in submission order; the slot is released when `task`
    /// completes.
    pub async fn run<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so acquire only fails if that changes
        let _permit = self.permits.acquire().await.ok();
        task.await
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Number of tasks currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.concurrency - self.permits.available_permits()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_pool_creation() {
        let pool = WorkerPool::default();
        assert_eq!(pool.concurrency(), 5);
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(WorkerPool::new(0).concurrency(), 1);
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency_and_keeps_order() {
        let pool = WorkerPool::new(3);
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let tasks = (0..12u64).map(|i| {
            let pool = &pool;
            let active = &active;
            let peak = &peak;
            pool.run(async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                assert!(pool.in_flight() <= 3);
                tokio::time::sleep(Duration::from_millis(20 - i)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                i
            })
        });

        let results = join_all(tasks).await;
        assert_eq!(results, (0..12).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(pool.in_flight(), 0);
    }
}
