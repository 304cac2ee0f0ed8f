//! Bounded worker pool for fetch tasks

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Admission gate shared by every batch of one reader
///
/// A pool of size one (or zero) runs fetches inline on the caller's task, one
/// after another, and never touches the semaphore.
#[derive(Debug, Clone)]
pub(crate) struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub(crate) fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub(crate) fn is_sequential(&self) -> bool {
        self.size <= 1
    }

    /// Wait for a free worker slot
    ///
    /// Returns `None` if the pool was closed or `cancel` fired first.
    pub(crate) async fn acquire(&self, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok(),
        }
    }

    /// Stop admitting work; waiting tasks give up
    pub(crate) fn close(&self) {
        self.semaphore.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_bounded() {
        let pool = WorkerPool::new(2);
        let token = CancellationToken::new();
        let _a = pool.acquire(&token).await.unwrap();
        let _b = pool.acquire(&token).await.unwrap();
        assert_eq!(pool.semaphore.available_permits(), 0);
        assert!(!pool.is_sequential());
    }

    #[tokio::test]
    async fn test_closed_pool_admits_nothing() {
        let pool = WorkerPool::new(3);
        pool.close();
        assert!(pool.acquire(&CancellationToken::new()).await.is_none());
        assert!(pool.semaphore.is_closed());
    }

    #[tokio::test]
    async fn test_cancel_releases_waiter() {
        let pool = WorkerPool::new(2);
        let token = CancellationToken::new();
        let _a = pool.acquire(&token).await.unwrap();
        let _b = pool.acquire(&token).await.unwrap();
        token.cancel();
        assert!(pool.acquire(&token).await.is_none());
    }

    #[test]
    fn test_single_worker_is_sequential() {
        assert!(WorkerPool::new(0).is_sequential());
        assert!(WorkerPool::new(1).is_sequential());
    }
}
