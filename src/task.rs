//! # Hello Task
//!
//! One unit of work per `helloAsync` invocation.
//!
//! ## Lifecycle
//!
//! ```text
//! Created -> Queued -> Executing -> Succeeded | Failed -> (complete) -> dropped
//! ```
//!
//! - [`HelloTask::execute`] runs on a worker thread and only reads the task's
//!   own inputs. Computation errors and panics are both captured into
//!   [`TaskState::Failed`]; nothing unwinds out of it.
//! - [`HelloTask::complete`] runs on the host's context thread, consumes the
//!   task and invokes its callback exactly once.
//!
//! The result buffer and the error message are variants of the same enum,
//! so a finished task carries exactly one of them.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::HelloResult;
use crate::greeting::Greeting;
use crate::host::HostContext;
use crate::options::HelloOptions;

const NEVER_EXECUTED: &str = "task was completed before it executed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Queued,
    Executing,
    Succeeded(Vec<u8>),
    Failed(String),
}

impl TaskState {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskState::Succeeded(_) | TaskState::Failed(_))
    }

    fn label(&self) -> &'static str {
        match self {
            TaskState::Created => "created",
            TaskState::Queued => "queued",
            TaskState::Executing => "executing",
            TaskState::Succeeded(_) => "succeeded",
            TaskState::Failed(_) => "failed",
        }
    }
}

pub struct HelloTask<C> {
    id: Uuid,
    emphasize: bool,
    as_bytes: bool,
    greeting: Arc<Greeting>,
    state: TaskState,
    completion: C,
}

impl<C> std::fmt::Debug for HelloTask<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelloTask")
            .field("id", &self.id)
            .field("emphasize", &self.emphasize)
            .field("as_bytes", &self.as_bytes)
            .field("state", &self.state.label())
            .finish()
    }
}

impl<C> HelloTask<C> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }
}

impl<C: Send + 'static> HelloTask<C> {
    pub fn new(options: HelloOptions, greeting: Arc<Greeting>, completion: C) -> Self {
        let id = Uuid::now_v7();
        debug!(task_id = %id, louder = options.louder, buffer = options.buffer, "Task created");
        Self {
            id,
            emphasize: options.louder,
            as_bytes: options.buffer,
            greeting,
            state: TaskState::Created,
            completion,
        }
    }

    /// Record that the task has been handed to a scheduler.
    pub fn mark_queued(&mut self) {
        if self.state == TaskState::Created {
            self.state = TaskState::Queued;
            debug!(task_id = %self.id, "Task queued");
        } else {
            warn!(task_id = %self.id, state = self.state.label(), "Ignoring re-queue of task");
        }
    }

    /// Run the computation. Worker-thread side: must not touch host state.
    ///
    /// Calling this on a finished task does nothing.
    pub fn execute(&mut self) {
        if self.state.is_finished() {
            warn!(task_id = %self.id, state = self.state.label(), "Ignoring re-execution of finished task");
            return;
        }

        self.state = TaskState::Executing;
        debug!(task_id = %self.id, "Task executing");

        let greeting = Arc::clone(&self.greeting);
        let emphasize = self.emphasize;
        self.state = match run_guarded(move || greeting.render(emphasize)) {
            Ok(bytes) => {
                debug!(task_id = %self.id, len = bytes.len(), "Task succeeded");
                TaskState::Succeeded(bytes)
            }
            Err(message) => {
                warn!(task_id = %self.id, error = %message, "Task failed");
                TaskState::Failed(message)
            }
        };
    }

    /// Deliver the outcome through the host and release the task.
    ///
    /// Context-thread side. Invokes the callback with `(error, null)` on
    /// failure and `(null, result)` on success, where `result` is a byte
    /// buffer when the task was created with `buffer: true` and text
    /// otherwise.
    ///
    /// If the host cannot build the result value, the callback receives that
    /// failure as its error instead. Only when the host cannot build even an
    /// error value is the callback released uninvoked, and the host error
    /// returned.
    pub fn complete<H>(self, host: &mut H) -> Result<(), H::Error>
    where
        H: HostContext<Callback = C>,
    {
        let HelloTask {
            id,
            as_bytes,
            state,
            completion,
            ..
        } = self;

        let arguments = match outcome_arguments(host, id, as_bytes, state) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(task_id = %id, error = %e, "Host could not build callback arguments, delivering as error");
                match failure_arguments(host, &e.to_string()) {
                    Ok(arguments) => arguments,
                    Err(e) => {
                        error!(task_id = %id, error = %e, "Host could not build an error value, releasing callback");
                        host.release(completion);
                        return Err(e);
                    }
                }
            }
        };

        let (error, result) = arguments;
        host.invoke(completion, error, result)?;
        debug!(task_id = %id, "Task completed");
        Ok(())
    }
}

fn outcome_arguments<H: HostContext>(
    host: &mut H,
    id: Uuid,
    as_bytes: bool,
    state: TaskState,
) -> Result<(H::Value, H::Value), H::Error> {
    match state {
        TaskState::Succeeded(bytes) => {
            let value = if as_bytes {
                host.bytes_value(bytes)?
            } else {
                // Bytes came from a String in execute()
                let text = String::from_utf8(bytes)
                    .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
                host.text_value(text)?
            };
            Ok((host.null()?, value))
        }
        TaskState::Failed(message) => failure_arguments(host, &message),
        pending => {
            warn!(task_id = %id, state = pending.label(), "Completing a task that never executed");
            failure_arguments(host, NEVER_EXECUTED)
        }
    }
}

fn failure_arguments<H: HostContext>(
    host: &mut H,
    message: &str,
) -> Result<(H::Value, H::Value), H::Error> {
    Ok((host.error_value(message)?, host.null()?))
}

/// Run a computation behind a panic guard, turning both returned errors and
/// panics into an error message.
pub(crate) fn run_guarded<F>(work: F) -> Result<Vec<u8>, String>
where
    F: FnOnce() -> HelloResult<String>,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(text)) => Ok(text.into_bytes()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "computation panicked".to_string()
    }
}
