//! Test host for exercising the bridge without an embedding runtime.
//!
//! `RecordingHost` builds plain Rust values and records every callback
//! invocation together with the thread it ran on.

use std::cell::Cell;
use std::thread::{self, ThreadId};

use crate::error::{HelloError, HelloResult};
use crate::host::HostContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostValue {
    Null,
    Error(String),
    Text(String),
    Bytes(Vec<u8>),
}

impl HostValue {
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Text view of a text or bytes value.
    pub fn as_text(&self) -> Option<String> {
        match self {
            HostValue::Text(s) => Some(s.clone()),
            HostValue::Bytes(b) => String::from_utf8(b.clone()).ok(),
            _ => None,
        }
    }
}

/// Not `Clone`: a callback can only be handed out, and invoked, once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub callback: u64,
    pub error: HostValue,
    pub result: HostValue,
    pub thread: ThreadId,
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    next_callback: Cell<u64>,
    calls: Vec<Invocation>,
    released: Vec<u64>,
    fail_invocations: bool,
    fail_results: bool,
    fail_errors: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose callbacks always throw.
    pub fn failing() -> Self {
        Self {
            fail_invocations: true,
            ..Self::default()
        }
    }

    /// A host that cannot build text or byte values.
    pub fn failing_results() -> Self {
        Self {
            fail_results: true,
            ..Self::default()
        }
    }

    /// A host that cannot build any value except null.
    pub fn unusable() -> Self {
        Self {
            fail_results: true,
            fail_errors: true,
            ..Self::default()
        }
    }

    pub fn callback(&self) -> CallbackId {
        let id = self.next_callback.get();
        self.next_callback.set(id + 1);
        CallbackId(id)
    }

    pub fn calls(&self) -> &[Invocation] {
        &self.calls
    }

    pub fn call_for(&self, callback: u64) -> Option<&Invocation> {
        self.calls.iter().find(|c| c.callback == callback)
    }

    /// Callbacks released without being invoked.
    pub fn released(&self) -> &[u64] {
        &self.released
    }
}

impl HostContext for RecordingHost {
    type Value = HostValue;
    type Callback = CallbackId;
    type Error = HelloError;

    fn null(&mut self) -> HelloResult<HostValue> {
        Ok(HostValue::Null)
    }

    fn error_value(&mut self, message: &str) -> HelloResult<HostValue> {
        if self.fail_errors {
            return Err(HelloError::host("could not allocate error value"));
        }
        Ok(HostValue::Error(message.to_string()))
    }

    fn text_value(&mut self, text: String) -> HelloResult<HostValue> {
        if self.fail_results {
            return Err(HelloError::host("could not allocate string"));
        }
        Ok(HostValue::Text(text))
    }

    fn bytes_value(&mut self, bytes: Vec<u8>) -> HelloResult<HostValue> {
        if self.fail_results {
            return Err(HelloError::host("could not allocate buffer"));
        }
        Ok(HostValue::Bytes(bytes))
    }

    fn invoke(
        &mut self,
        callback: CallbackId,
        error: HostValue,
        result: HostValue,
    ) -> HelloResult<()> {
        self.calls.push(Invocation {
            callback: callback.0,
            error,
            result,
            thread: thread::current().id(),
        });
        if self.fail_invocations {
            return Err(HelloError::host(format!("callback {} threw", callback.0)));
        }
        Ok(())
    }

    fn release(&mut self, callback: CallbackId) {
        self.released.push(callback.0);
    }
}
