//! Bounded executor for blocking FTP calls
//!
//! Provides non-blocking execution of blocking connection work with:
//! - Semaphore to limit concurrent blocking calls (default: 10)
//! - Permits owned by the blocking task, so abandoned requests still count
//!   until their FTP call returns

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, instrument};

use crate::error::{Result, WorkerError};

/// Default number of concurrent blocking workers
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Runs blocking closures on tokio's blocking pool, at most `max_workers` at a time
#[derive(Clone)]
pub struct BlockingExecutor {
    /// Semaphore for concurrency control
    semaphore: Arc<Semaphore>,
}

impl BlockingExecutor {
    /// Create a new executor with default settings
    pub fn new() -> Self {
        Self::with_max_workers(DEFAULT_MAX_WORKERS)
    }

    /// Create an executor with custom concurrency limit
    pub fn with_max_workers(max_workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
        }
    }

    /// Permits currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run `f` on a blocking thread and return its result
    #[instrument(skip_all)]
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::Closed)?;

        debug!("Dispatching blocking call ({} permits left)", self.available());

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| WorkerError::Panicked(e.to_string()))?
    }

    /// Stop handing out permits; pending and future `run` calls fail
    pub fn close(&self) {
        self.semaphore.close();
    }
}

impl Default for BlockingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::error::Error;

    #[tokio::test]
    async fn test_run_returns_value() {
        let executor = BlockingExecutor::new();
        let value = executor.run(|| Ok(21 * 2)).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(executor.available(), DEFAULT_MAX_WORKERS);
    }

    #[tokio::test]
    async fn test_run_propagates_errors() {
        let executor = BlockingExecutor::new();
        let result: Result<()> = executor
            .run(|| Err(WorkerError::Closed.into()))
            .await;
        assert!(matches!(result, Err(Error::Worker(WorkerError::Closed))));
    }

    #[tokio::test]
    async fn test_panic_becomes_worker_error() {
        let executor = BlockingExecutor::new();
        let result: Result<()> = executor.run(|| panic!("boom")).await;
        assert!(matches!(result, Err(Error::Worker(WorkerError::Panicked(_)))));
        // The permit must come back even after a panic
        assert_eq!(executor.available(), DEFAULT_MAX_WORKERS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let executor = BlockingExecutor::with_max_workers(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let executor = executor.clone();
                let running = running.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    executor
                        .run(move || {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            running.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .await
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_closed_executor_rejects_work() {
        let executor = BlockingExecutor::with_max_workers(1);
        executor.close();
        let result = executor.run(|| Ok(())).await;
        assert!(matches!(result, Err(Error::Worker(WorkerError::Closed))));
    }
}
