//! # hello-async
//!
//! Asynchronous task/callback bridge behind the `helloAsync` native binding.
//!
//! A [`HelloTask`] is built on the host's thread, executed on a worker
//! thread where it may not touch host state, and completed back on the
//! host's context thread where its error-first callback is invoked exactly
//! once.
//!
//! ## Layout
//!
//! - [`task`]: the task object and its state machine
//! - [`bridge`]: in-process scheduler: worker submission plus a completion
//!   queue drained on the context thread
//! - [`host`]: capability surface the completion phase needs from the host
//! - [`invoke`]: the `hello_async` entry point (validate, then submit)
//! - [`greeting`], [`options`]: formatting and argument validation
//! - [`pool`]: worker pool seam
//! - [`config`], [`logging`], [`error`]: ambient plumbing
//!
//! The Node.js binding lives in `crates/hello-async-node` and reuses
//! [`HelloTask`] with libuv's thread pool as the scheduler.

pub mod bridge;
pub mod config;
pub mod error;
pub mod greeting;
pub mod host;
pub mod invoke;
pub mod logging;
pub mod options;
pub mod pool;
pub mod task;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use bridge::TaskBridge;
pub use config::{HelloConfig, PoolConfig};
pub use error::{HelloError, HelloResult};
pub use greeting::Greeting;
pub use host::HostContext;
pub use invoke::hello_async;
pub use options::{HelloOptions, OptionValue};
pub use pool::{TokioWorkerPool, WorkerPool};
pub use task::{HelloTask, TaskState};
