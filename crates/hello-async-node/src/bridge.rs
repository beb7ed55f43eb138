//! `helloAsync` over napi-rs.
//!
//! Node's libuv thread pool is the scheduler here: `env.spawn` queues a
//! napi async work item whose `compute` runs [`HelloTask::execute`] on a
//! pool thread and whose `resolve` runs [`HelloTask::complete`] back on the
//! JavaScript thread with a [`NodeContext`] wrapping that thread's `Env`.

use std::sync::{Arc, OnceLock};

use napi::bindgen_prelude::*;
use napi::{Env, JsBoolean, JsFunction, JsObject, JsUnknown, Ref, Task, ValueType};
use tracing::{debug, warn};

use hello_async::{Greeting, HelloConfig, HelloError, HelloOptions, HelloTask, HostContext, OptionValue};

use crate::error::NodeBindingError;

static GREETING: OnceLock<Arc<Greeting>> = OnceLock::new();

fn greeting() -> Arc<Greeting> {
    Arc::clone(GREETING.get_or_init(|| {
        hello_async::logging::init_tracing();
        match HelloConfig::load(None) {
            Ok(config) => Arc::new(config.greeting),
            Err(e) => {
                warn!(error = %e, "Failed to load config, using default greeting");
                Arc::new(Greeting::default())
            }
        }
    }))
}

/// Persistent reference to the user's callback.
pub struct CallbackRef(Ref<()>);

// SAFETY: the reference is created on the JavaScript thread in
// `hello_async` and only dereferenced or released in `NodeContext::invoke`,
// which runs on that same thread from `Task::resolve`. Worker threads only
// move it around inside the task.
unsafe impl Send for CallbackRef {}

impl std::fmt::Debug for CallbackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CallbackRef")
    }
}

/// Host context for the JavaScript thread.
#[derive(Clone, Copy)]
pub struct NodeContext {
    env: Env,
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NodeContext")
    }
}

impl NodeContext {
    pub fn new(env: Env) -> Self {
        Self { env }
    }

    /// Call a function that was never wrapped in a task (validation errors).
    fn call_now(&mut self, callback: &JsFunction, message: &str) -> Result<()> {
        let error = self.error_value(message)?;
        let result = self.null()?;
        callback.call(None, &[error, result])?;
        Ok(())
    }
}

impl HostContext for NodeContext {
    type Value = JsUnknown;
    type Callback = CallbackRef;
    type Error = napi::Error;

    fn null(&mut self) -> Result<JsUnknown> {
        Ok(self.env.get_null()?.into_unknown())
    }

    fn error_value(&mut self, message: &str) -> Result<JsUnknown> {
        let error = self.env.create_error(napi::Error::from_reason(message))?;
        Ok(error.into_unknown())
    }

    fn text_value(&mut self, text: String) -> Result<JsUnknown> {
        Ok(self.env.create_string_from_std(text)?.into_unknown())
    }

    fn bytes_value(&mut self, bytes: Vec<u8>) -> Result<JsUnknown> {
        Ok(self.env.create_buffer_with_data(bytes)?.into_raw().into_unknown())
    }

    fn invoke(&mut self, callback: CallbackRef, error: JsUnknown, result: JsUnknown) -> Result<()> {
        let mut reference = callback.0;
        let outcome = self
            .env
            .get_reference_value::<JsFunction>(&reference)
            .and_then(|function| function.call(None, &[error, result]));
        reference.unref(self.env)?;
        outcome.map(|_| ())
    }

    fn release(&mut self, callback: CallbackRef) {
        let mut reference = callback.0;
        if let Err(e) = reference.unref(self.env) {
            warn!(error = %e, "Failed to release callback reference");
        }
    }
}

/// napi async work item carrying one [`HelloTask`].
///
/// `env.spawn` wraps the work in a promise that nothing awaits. A callback
/// that throws fails `resolve`, which rejects that promise, so Node reports
/// the throw as an unhandled rejection.
#[derive(Debug)]
pub struct HelloAsyncTask {
    task: Option<HelloTask<CallbackRef>>,
}

impl Task for HelloAsyncTask {
    type Output = ();
    type JsValue = ();

    fn compute(&mut self) -> Result<()> {
        if let Some(task) = self.task.as_mut() {
            task.execute();
        }
        Ok(())
    }

    fn resolve(&mut self, env: Env, _output: ()) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.complete(&mut NodeContext::new(env))?;
        }
        Ok(())
    }
}

fn type_name(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Undefined => "undefined",
        ValueType::Null => "null",
        ValueType::Boolean => "boolean",
        ValueType::Number => "number",
        ValueType::String => "string",
        ValueType::Symbol => "symbol",
        ValueType::Object => "object",
        ValueType::Function => "function",
        _ => "unknown",
    }
}

fn read_option(options: &JsObject, name: &'static str) -> std::result::Result<OptionValue, NodeBindingError> {
    let read_err = |e: napi::Error| NodeBindingError::OptionRead {
        name,
        reason: e.to_string(),
    };

    if !options.has_named_property(name).map_err(read_err)? {
        return Ok(OptionValue::Missing);
    }

    let value: JsUnknown = options
        .get_named_property_unchecked(name)
        .map_err(read_err)?;
    match value.get_type().map_err(read_err)? {
        ValueType::Boolean => {
            // SAFETY: type checked as Boolean just above
            let flag = unsafe { value.cast::<JsBoolean>() };
            Ok(OptionValue::Bool(flag.get_value().map_err(read_err)?))
        }
        other => Ok(OptionValue::Other(type_name(other))),
    }
}

fn parse_options(options: &JsUnknown) -> std::result::Result<HelloOptions, NodeBindingError> {
    let read_err = |e: napi::Error| NodeBindingError::OptionRead {
        name: "options",
        reason: e.to_string(),
    };

    // Functions are objects too, and may carry option properties
    match options.get_type().map_err(read_err)? {
        ValueType::Object | ValueType::Function => {}
        _ => {
            return Err(
                HelloError::invalid_options(hello_async::options::OPTIONS_NOT_OBJECT).into(),
            )
        }
    }
    // SAFETY: type checked as Object or Function just above
    let options = unsafe { options.cast::<JsObject>() };

    let louder = read_option(&options, "louder")?;
    let buffer = read_option(&options, "buffer")?;
    Ok(HelloOptions::from_fields(louder, buffer)?)
}

/// Asynchronously build the greeting and hand it to `callback(err, result)`.
///
/// Throws a `TypeError` when `callback` is not a function. Invalid options
/// are reported through the callback without queueing any work.
#[napi(
    ts_args_type = "options: { louder?: boolean; buffer?: boolean }, callback: (err: Error | null, result?: string | Buffer) => void"
)]
pub fn hello_async(env: Env, options: JsUnknown, callback: JsUnknown) -> Result<()> {
    if callback.get_type()? != ValueType::Function {
        env.throw_type_error(&HelloError::CallbackNotFunction.to_string(), None)?;
        return Ok(());
    }
    // SAFETY: type checked as Function just above
    let callback = unsafe { callback.cast::<JsFunction>() };

    let options = match parse_options(&options) {
        Ok(options) => options,
        Err(NodeBindingError::Bridge(e)) => {
            debug!(error = %e, "Rejecting helloAsync invocation");
            return NodeContext::new(env).call_now(&callback, &e.to_string());
        }
        Err(e) => return Err(e.into()),
    };

    let completion = CallbackRef(env.create_reference(callback)?);
    let mut task = HelloTask::new(options, greeting(), completion);
    task.mark_queued();

    env.spawn(HelloAsyncTask { task: Some(task) })?;
    Ok(())
}
