//! # Error Types
//!
//! Unified error handling for the task bridge, its configuration and the
//! bindings built on top of it.

use thiserror::Error;

/// Bridge operation result type
pub type HelloResult<T> = Result<T, HelloError>;

#[derive(Debug, Error)]
pub enum HelloError {
    /// Malformed invocation arguments, surfaced before any task exists.
    #[error("{0}")]
    InvalidOptions(String),

    #[error("second arg 'callback' must be a function")]
    CallbackNotFunction,

    /// Failure inside the worker-side computation.
    #[error("{0}")]
    Computation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Timed out after {waited_ms}ms with {in_flight} task(s) still in flight")]
    Timeout { waited_ms: u128, in_flight: usize },

    /// Failure raised by the embedding host while delivering a result.
    #[error("Host error: {0}")]
    Host(String),
}

impl HelloError {
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions(message.into())
    }

    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation(message.into())
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn host(message: impl Into<String>) -> Self {
        Self::Host(message.into())
    }

    /// Whether this error is raised synchronously by argument validation
    /// rather than delivered through a completion callback.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HelloError::InvalidOptions(_) | HelloError::CallbackNotFunction
        )
    }
}

impl From<toml::de::Error> for HelloError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_verbatim() {
        let err = HelloError::invalid_options("first arg 'options' must be an object");
        assert_eq!(err.to_string(), "first arg 'options' must be an object");
        assert_eq!(
            HelloError::CallbackNotFunction.to_string(),
            "second arg 'callback' must be a function"
        );
    }

    #[test]
    fn test_is_validation() {
        assert!(HelloError::invalid_options("x").is_validation());
        assert!(HelloError::CallbackNotFunction.is_validation());
        assert!(!HelloError::computation("boom").is_validation());
        assert!(!HelloError::config_error("bad").is_validation());
        assert!(!HelloError::host("callback threw").is_validation());
    }

    #[test]
    fn test_timeout_display() {
        let err = HelloError::Timeout {
            waited_ms: 250,
            in_flight: 3,
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 250ms with 3 task(s) still in flight"
        );
    }

    #[test]
    fn test_toml_error_maps_to_config() {
        let parse: Result<toml::Value, _> = toml::from_str("not = [valid");
        let err = HelloError::from(parse.unwrap_err());
        assert!(matches!(err, HelloError::Config(_)));
    }
}
