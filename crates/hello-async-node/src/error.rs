//! Error types for the napi-rs boundary.
//!
//! Synchronous failures become JavaScript exceptions; everything that
//! happens after a task is queued reaches JavaScript through the callback.

use hello_async::HelloError;

#[derive(Debug, thiserror::Error)]
pub enum NodeBindingError {
    #[error(transparent)]
    Bridge(#[from] HelloError),

    #[error("Failed to read option '{name}': {reason}")]
    OptionRead { name: &'static str, reason: String },
}

impl From<NodeBindingError> for napi::Error {
    fn from(err: NodeBindingError) -> Self {
        let status = match &err {
            NodeBindingError::Bridge(e) if e.is_validation() => napi::Status::InvalidArg,
            _ => napi::Status::GenericFailure,
        };
        napi::Error::new(status, err.to_string())
    }
}
