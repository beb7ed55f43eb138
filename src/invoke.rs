//! `hello_async` entry point for in-process hosts.
//!
//! Validates the options on the calling (context) thread. Invalid options
//! are reported through the callback right away and no task is built; valid
//! ones become a [`HelloTask`] submitted to the bridge.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

use crate::bridge::TaskBridge;
use crate::greeting::Greeting;
use crate::host::HostContext;
use crate::options::HelloOptions;
use crate::task::HelloTask;

/// Returns the submitted task's id, or `None` when validation failed and the
/// callback has already been invoked with the error.
pub fn hello_async<H>(
    bridge: &TaskBridge<H::Callback>,
    host: &mut H,
    greeting: &Arc<Greeting>,
    options: &JsonValue,
    callback: H::Callback,
) -> Result<Option<Uuid>, H::Error>
where
    H: HostContext,
{
    let options = match HelloOptions::from_json(options) {
        Ok(options) => options,
        Err(e) => {
            debug!(error = %e, "Rejecting helloAsync invocation");
            let error = host.error_value(&e.to_string())?;
            let result = host.null()?;
            host.invoke(callback, error, result)?;
            return Ok(None);
        }
    };

    let task = HelloTask::new(options, Arc::clone(greeting), callback);
    let task_id = task.id();
    bridge.submit(task);
    Ok(Some(task_id))
}
