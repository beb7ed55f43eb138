//! # Task Bridge
//!
//! In-process scheduler for hosts that own their event loop.
//!
//! Work moves in two phases:
//!
//! 1. [`TaskBridge::submit`] marks the task queued and hands it to the
//!    [`WorkerPool`]. The worker executes it and pushes the finished task onto
//!    the completion queue. No host handle crosses to the worker.
//! 2. The host's context thread calls [`TaskBridge::drain`] (from its loop) or
//!    [`TaskBridge::run_until_idle`] (blocking), which pops finished tasks and
//!    completes them with the host context passed in.
//!
//! Finished tasks are completed in the order workers finished them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, warn};

use crate::error::{HelloError, HelloResult};
use crate::host::HostContext;
use crate::pool::WorkerPool;
use crate::task::HelloTask;

pub struct TaskBridge<C> {
    pool: Arc<dyn WorkerPool>,
    completed_tx: Sender<HelloTask<C>>,
    completed_rx: Receiver<HelloTask<C>>,
    in_flight: AtomicUsize,
}

impl<C> std::fmt::Debug for TaskBridge<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBridge")
            .field("pool", &self.pool)
            .field("in_flight", &self.in_flight.load(Ordering::Acquire))
            .field("ready", &self.completed_rx.len())
            .finish()
    }
}

impl<C: Send + 'static> TaskBridge<C> {
    pub fn new(pool: Arc<dyn WorkerPool>) -> Self {
        let (completed_tx, completed_rx) = channel::unbounded();
        Self {
            pool,
            completed_tx,
            completed_rx,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Submitted tasks whose callbacks have not run yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Finished tasks waiting to be completed on the context thread.
    pub fn ready(&self) -> usize {
        self.completed_rx.len()
    }

    /// Queue a task onto the worker pool. Returns immediately.
    pub fn submit(&self, mut task: HelloTask<C>) {
        task.mark_queued();
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        debug!(task_id = %task.id(), in_flight = self.in_flight(), "Submitting task");

        let handoff = Handoff {
            task: Some(task),
            completed_tx: self.completed_tx.clone(),
        };
        self.pool.spawn(Box::new(move || handoff.run()));
    }

    /// Complete every finished task without blocking. Returns how many were
    /// completed.
    pub fn drain<H>(&self, host: &mut H) -> usize
    where
        H: HostContext<Callback = C>,
    {
        let mut completed = 0;
        while let Ok(task) = self.completed_rx.try_recv() {
            self.finish(task, host);
            completed += 1;
        }
        if completed > 0 {
            debug!(completed, in_flight = self.in_flight(), "Drained completion queue");
        }
        completed
    }

    /// Block the context thread until every submitted task has been
    /// completed, or until `timeout` elapses.
    pub fn run_until_idle<H>(&self, host: &mut H, timeout: Duration) -> HelloResult<usize>
    where
        H: HostContext<Callback = C>,
    {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut completed = 0;

        while self.in_flight() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completed_rx.recv_timeout(remaining) {
                Ok(task) => {
                    self.finish(task, host);
                    completed += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(HelloError::Timeout {
                        waited_ms: started.elapsed().as_millis(),
                        in_flight: self.in_flight(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // Unreachable while self holds a sender
                    return Err(HelloError::Runtime("completion queue disconnected".into()));
                }
            }
        }

        Ok(completed)
    }

    fn finish<H>(&self, task: HelloTask<C>, host: &mut H)
    where
        H: HostContext<Callback = C>,
    {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        let task_id = task.id();
        if let Err(e) = task.complete(host) {
            error!(%task_id, error = %e, "Failed to deliver task result to host");
        }
    }
}

/// Carries a task to its worker and back onto the completion queue.
///
/// If the pool drops the job without running it (a runtime that is shutting
/// down, say), the unexecuted task is still queued for completion so its
/// callback fires.
struct Handoff<C> {
    task: Option<HelloTask<C>>,
    completed_tx: Sender<HelloTask<C>>,
}

impl<C: Send + 'static> Handoff<C> {
    fn run(mut self) {
        if let Some(mut task) = self.task.take() {
            task.execute();
            self.send(task);
        }
    }
}

impl<C> Handoff<C> {
    fn send(&self, task: HelloTask<C>) {
        let task_id = task.id();
        if self.completed_tx.send(task).is_err() {
            warn!(%task_id, "Bridge dropped before task finished, discarding result");
        }
    }
}

impl<C> Drop for Handoff<C> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            warn!(task_id = %task.id(), "Worker pool dropped job before it ran");
            self.send(task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greeting::Greeting;
    use crate::options::HelloOptions;
    use crate::pool::{Job, TokioWorkerPool};
    use crate::testing::{CallbackId, HostValue, RecordingHost};
    use std::sync::Mutex;

    /// Pool that parks jobs until the test runs them.
    #[derive(Default)]
    struct ManualPool {
        jobs: Mutex<Vec<Job>>,
    }

    impl std::fmt::Debug for ManualPool {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ManualPool").finish_non_exhaustive()
        }
    }

    impl ManualPool {
        fn run_all(&self) {
            let jobs: Vec<Job> = self.jobs.lock().unwrap().drain(..).collect();
            for job in jobs {
                job();
            }
        }
    }

    impl WorkerPool for ManualPool {
        fn spawn(&self, job: Job) {
            self.jobs.lock().unwrap().push(job);
        }
    }

    /// Pool that refuses every job.
    #[derive(Debug)]
    struct RejectingPool;

    impl WorkerPool for RejectingPool {
        fn spawn(&self, job: Job) {
            drop(job);
        }
    }

    fn new_task(host: &RecordingHost, louder: bool) -> HelloTask<CallbackId> {
        HelloTask::new(
            HelloOptions::new(louder, false),
            Arc::new(Greeting::default()),
            host.callback(),
        )
    }

    #[test]
    fn test_submit_does_not_run_callback() {
        let pool = Arc::new(ManualPool::default());
        let bridge = TaskBridge::new(pool.clone());
        let mut host = RecordingHost::new();

        bridge.submit(new_task(&host, false));
        assert_eq!(bridge.in_flight(), 1);
        assert_eq!(bridge.drain(&mut host), 0);
        assert!(host.calls().is_empty());

        pool.run_all();
        assert_eq!(bridge.ready(), 1);
        assert_eq!(bridge.drain(&mut host), 1);
        assert_eq!(bridge.in_flight(), 0);
        assert_eq!(host.calls().len(), 1);
    }

    #[test]
    fn test_completion_order_follows_worker_finish_order() {
        let pool = Arc::new(ManualPool::default());
        let bridge = TaskBridge::new(pool.clone());
        let mut host = RecordingHost::new();

        bridge.submit(new_task(&host, false));
        bridge.submit(new_task(&host, true));

        // Run the second job first
        let mut jobs: Vec<Job> = pool.jobs.lock().unwrap().drain(..).collect();
        let second = jobs.pop().unwrap();
        second();
        jobs.pop().unwrap()();

        bridge.drain(&mut host);
        let order: Vec<u64> = host.calls().iter().map(|c| c.callback).collect();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_delivery_failure_is_logged_not_fatal() {
        let pool = Arc::new(ManualPool::default());
        let bridge = TaskBridge::new(pool.clone());
        let mut host = RecordingHost::failing();

        bridge.submit(new_task(&host, false));
        bridge.submit(new_task(&host, true));
        pool.run_all();

        assert_eq!(bridge.drain(&mut host), 2);
        assert_eq!(host.calls().len(), 2);
        assert_eq!(bridge.in_flight(), 0);
    }

    #[test]
    fn test_run_until_idle_times_out_when_workers_stall() {
        let pool = Arc::new(ManualPool::default());
        let bridge = TaskBridge::new(pool);
        let mut host = RecordingHost::new();

        bridge.submit(new_task(&host, false));
        let err = bridge
            .run_until_idle(&mut host, Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, HelloError::Timeout { in_flight: 1, .. }));
    }

    #[test]
    fn test_run_until_idle_with_nothing_submitted() {
        let bridge: TaskBridge<CallbackId> =
            TaskBridge::new(Arc::new(ManualPool::default()));
        let mut host = RecordingHost::new();
        assert_eq!(
            bridge.run_until_idle(&mut host, Duration::from_millis(1)).unwrap(),
            0
        );
    }

    #[test]
    fn test_rejected_job_still_calls_back() {
        let bridge = TaskBridge::new(Arc::new(RejectingPool));
        let mut host = RecordingHost::new();

        bridge.submit(new_task(&host, false));
        assert_eq!(bridge.ready(), 1);
        assert_eq!(
            bridge.run_until_idle(&mut host, Duration::from_secs(1)).unwrap(),
            1
        );

        assert_eq!(bridge.in_flight(), 0);
        let calls = host.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].error,
            HostValue::Error("task was completed before it executed".to_string())
        );
        assert_eq!(calls[0].result, HostValue::Null);
    }

    #[test]
    fn test_shut_down_runtime_still_calls_back() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let handle = runtime.handle().clone();
        runtime.shutdown_timeout(Duration::from_millis(100));

        let bridge = TaskBridge::new(Arc::new(TokioWorkerPool::from_handle(handle)));
        let mut host = RecordingHost::new();
        bridge.submit(new_task(&host, true));

        assert_eq!(
            bridge.run_until_idle(&mut host, Duration::from_secs(1)).unwrap(),
            1
        );
        assert_eq!(bridge.in_flight(), 0);
        assert!(matches!(host.calls()[0].error, HostValue::Error(_)));
    }

    #[test]
    fn test_callbacks_run_on_context_thread() {
        let pool = Arc::new(TokioWorkerPool::new(&Default::default()).unwrap());
        let bridge = TaskBridge::new(pool);
        let mut host = RecordingHost::new();

        for i in 0..4 {
            bridge.submit(new_task(&host, i % 2 == 0));
        }
        assert_eq!(
            bridge.run_until_idle(&mut host, Duration::from_secs(5)).unwrap(),
            4
        );

        let me = std::thread::current().id();
        assert!(host.calls().iter().all(|c| c.thread == me));
        assert!(host.calls().iter().all(|c| c.error == HostValue::Null));
    }
}
