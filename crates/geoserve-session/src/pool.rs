//! Bounded per-session worker pool.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::PoolError;

/// Fixed-size pool that runs blocking work off the async workers.
///
/// Each submission waits for one of `size` permits, then runs on the
/// blocking thread pool. Cancelling the pool fails every submission that
/// has not started yet; work already running is left to finish.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    size: usize,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Create a pool with `size` permits (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                size,
                permits: Arc::new(Semaphore::new(size)),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Number of permits.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Permits not currently held by running work.
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Refuse new work and fail queued work.
    pub fn cancel(&self) {
        debug!(size = self.inner.size, "Cancelling worker pool");
        self.inner.cancel.cancel();
        self.inner.permits.close();
    }

    /// Submit blocking work. The returned handle resolves once the work ran
    /// (or was refused).
    pub fn submit<F, T>(&self, work: F) -> JoinHandle<Result<T, PoolError>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.inner.permits);
        let cancel = self.inner.cancel.clone();

        tokio::spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PoolError::Cancelled),
                permit = permits.acquire_owned() => permit.map_err(|_| PoolError::Cancelled)?,
            };

            let result = tokio::task::spawn_blocking(work).await;
            drop(permit);
            result.map_err(|e| PoolError::Panicked(e.to_string()))
        })
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.inner.size)
            .field("available", &self.available())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
