//! # Host Context
//!
//! The capability surface the completion phase needs from the embedding
//! runtime. A `HostContext` is only ever used on the thread that owns the
//! runtime's execution context; it is handed to [`HelloTask::complete`]
//! explicitly rather than reached through global state.
//!
//! Callbacks must be `Send` because they travel with the task through the
//! worker pool. Worker code never dereferences them.
//!
//! [`HelloTask::complete`]: crate::task::HelloTask::complete

pub trait HostContext {
    /// A host-visible value.
    type Value;

    /// An owned, invocable callback reference.
    type Callback: Send + 'static;

    /// Failure raised by the host while building values or calling back.
    type Error: std::fmt::Display;

    /// The host's null/none value.
    fn null(&mut self) -> Result<Self::Value, Self::Error>;

    /// A host error value carrying `message`.
    fn error_value(&mut self, message: &str) -> Result<Self::Value, Self::Error>;

    /// A text value. Takes ownership of the string.
    fn text_value(&mut self, text: String) -> Result<Self::Value, Self::Error>;

    /// A raw byte buffer. Takes ownership of the bytes.
    fn bytes_value(&mut self, bytes: Vec<u8>) -> Result<Self::Value, Self::Error>;

    /// Invoke `callback` with the error-first pair `(error, result)` and
    /// release it.
    fn invoke(
        &mut self,
        callback: Self::Callback,
        error: Self::Value,
        result: Self::Value,
    ) -> Result<(), Self::Error>;

    /// Release a callback without invoking it. Only used when the host could
    /// not build any arguments to call it with. Hosts that pin callbacks
    /// (persistent references, handles) free them here.
    fn release(&mut self, callback: Self::Callback) {
        drop(callback);
    }
}
