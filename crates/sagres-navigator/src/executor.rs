//! Bounded worker pools for network and disk work.
//!
//! The two pools are sized independently so that file writes never hold up
//! request dispatch and vice versa.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::error::{SagresError, SagresResult};

pub const DEFAULT_NETWORK_PERMITS: usize = 8;
pub const DEFAULT_DISK_PERMITS: usize = 2;

#[derive(Debug, Clone)]
pub struct TaskExecutor {
    network: Arc<Semaphore>,
    disk: Arc<Semaphore>,
}

impl Default for TaskExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK_PERMITS, DEFAULT_DISK_PERMITS)
    }
}

impl TaskExecutor {
    pub fn new(network_permits: usize, disk_permits: usize) -> Self {
        Self {
            network: Arc::new(Semaphore::new(network_permits.max(1))),
            disk: Arc::new(Semaphore::new(disk_permits.max(1))),
        }
    }

    /// Spawn `future` once a network permit is free.
    pub fn spawn_network<F>(&self, future: F) -> JoinHandle<SagresResult<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let semaphore = self.network.clone();
        tokio::spawn(async move {
            let _permit = acquire(semaphore).await?;
            Ok(future.await)
        })
    }

    /// Run blocking `work` on the blocking pool once a disk permit is free.
    pub async fn run_disk<F, T>(&self, work: F) -> SagresResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _permit = acquire(self.disk.clone()).await?;
        Ok(tokio::task::spawn_blocking(work).await?)
    }

    pub fn available_network(&self) -> usize {
        self.network.available_permits()
    }

    pub fn available_disk(&self) -> usize {
        self.disk.available_permits()
    }
}

async fn acquire(semaphore: Arc<Semaphore>) -> SagresResult<OwnedSemaphorePermit> {
    semaphore
        .acquire_owned()
        .await
        .map_err(|e| SagresError::Executor(format!("Semaphore error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_network_pool_bounds_concurrency() {
        let executor = TaskExecutor::new(2, 1);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                executor.spawn_network(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(executor.available_network(), 2);
    }

    #[tokio::test]
    async fn test_disk_pool_runs_blocking_work() {
        let executor = TaskExecutor::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let target = path.clone();
        executor
            .run_disk(move || std::fs::write(target, b"ok"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"ok");
        assert_eq!(executor.available_disk(), DEFAULT_DISK_PERMITS);
    }
}
