//! Worker pool seam.
//!
//! The bridge never owns threads itself; it hands jobs to whatever pool the
//! embedding host provides. [`TokioWorkerPool`] runs them on tokio's blocking
//! pool, either on a runtime it owns or on an existing runtime handle.

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info};

use crate::config::PoolConfig;
use crate::error::{HelloError, HelloResult};

/// A unit of blocking work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Thread pool the host lends to the bridge. Submission must not block.
///
/// A pool that cannot run a job drops it. The bridge notices the drop and
/// still completes the task, with an error.
pub trait WorkerPool: Send + Sync + std::fmt::Debug {
    fn spawn(&self, job: Job);
}

pub struct TokioWorkerPool {
    // Only set when this pool built its own runtime
    runtime: Option<Runtime>,
    handle: Handle,
}

impl std::fmt::Debug for TokioWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioWorkerPool")
            .field("owns_runtime", &self.runtime.is_some())
            .finish()
    }
}

impl TokioWorkerPool {
    /// Build a dedicated runtime sized by `config`.
    pub fn new(config: &PoolConfig) -> HelloResult<Self> {
        config.validate()?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .max_blocking_threads(config.max_blocking_threads)
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()
            .map_err(|e| HelloError::Runtime(format!("Runtime creation failed: {}", e)))?;

        info!(
            worker_threads = config.worker_threads,
            max_blocking_threads = config.max_blocking_threads,
            "Worker pool started"
        );

        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    /// Borrow an existing runtime's blocking pool.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            runtime: None,
            handle,
        }
    }

    /// Borrow the runtime the caller is currently running inside.
    pub fn current() -> HelloResult<Self> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|e| HelloError::Runtime(format!("No tokio runtime available: {}", e)))
    }
}

impl WorkerPool for TokioWorkerPool {
    fn spawn(&self, job: Job) {
        debug!("Dispatching job to blocking pool");
        // The join handle is dropped: completion is reported through the
        // bridge's completion queue, not through tokio.
        drop(self.handle.spawn_blocking(job));
    }
}

impl Drop for TokioWorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_owned_pool_runs_jobs_off_thread() {
        let pool = TokioWorkerPool::new(&PoolConfig::default()).unwrap();
        let (tx, rx) = mpsc::channel();
        let caller = std::thread::current().id();

        pool.spawn(Box::new(move || {
            tx.send(std::thread::current().id()).unwrap();
        }));

        let worker = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(worker, caller);
    }

    #[test]
    fn test_current_without_runtime_fails() {
        let err = TokioWorkerPool::current().unwrap_err();
        assert!(matches!(err, HelloError::Runtime(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_from_current_handle() {
        let pool = TokioWorkerPool::current().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        pool.spawn(Box::new(move || {
            let _ = tx.send(21 * 2);
        }));
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[test]
    fn test_rejects_zero_blocking_threads() {
        let config = PoolConfig {
            max_blocking_threads: 0,
            ..PoolConfig::default()
        };
        assert!(matches!(
            TokioWorkerPool::new(&config),
            Err(HelloError::Config(_))
        ));
    }
}
