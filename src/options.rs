//! Validation of the `options` argument.
//!
//! Recognized fields are `louder` and `buffer`; both are optional and must be
//! booleans when present. Unrecognized fields are ignored.

use serde_json::Value as JsonValue;

use crate::error::{HelloError, HelloResult};

pub const OPTIONS_NOT_OBJECT: &str = "first arg 'options' must be an object";

/// A single option field as observed on the host value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionValue {
    Missing,
    Bool(bool),
    /// Present with a non-boolean type, named for diagnostics.
    Other(&'static str),
}

impl OptionValue {
    fn resolve(self, name: &str) -> HelloResult<bool> {
        match self {
            OptionValue::Missing => Ok(false),
            OptionValue::Bool(value) => Ok(value),
            OptionValue::Other(type_name) => {
                tracing::debug!(option = name, %type_name, "Rejecting non-boolean option");
                Err(HelloError::invalid_options(format!(
                    "option '{name}' must be a boolean"
                )))
            }
        }
    }
}

impl From<Option<&JsonValue>> for OptionValue {
    fn from(value: Option<&JsonValue>) -> Self {
        match value {
            None => OptionValue::Missing,
            Some(JsonValue::Bool(b)) => OptionValue::Bool(*b),
            Some(other) => OptionValue::Other(json_type_name(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HelloOptions {
    /// Emphasize the greeting
    pub louder: bool,
    /// Deliver raw bytes instead of text
    pub buffer: bool,
}

impl HelloOptions {
    pub fn new(louder: bool, buffer: bool) -> Self {
        Self { louder, buffer }
    }

    /// Validate fields already extracted from an object. `louder` is checked
    /// first.
    pub fn from_fields(louder: OptionValue, buffer: OptionValue) -> HelloResult<Self> {
        Ok(Self {
            louder: louder.resolve("louder")?,
            buffer: buffer.resolve("buffer")?,
        })
    }

    /// Validate a JSON-shaped options value. Arrays are accepted as objects
    /// without recognized fields, mirroring JavaScript's notion of "object".
    pub fn from_json(value: &JsonValue) -> HelloResult<Self> {
        match value {
            JsonValue::Object(map) => Self::from_fields(
                OptionValue::from(map.get("louder")),
                OptionValue::from(map.get("buffer")),
            ),
            JsonValue::Array(_) => Ok(Self::default()),
            _ => Err(HelloError::invalid_options(OPTIONS_NOT_OBJECT)),
        }
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_defaults() {
        let opts = HelloOptions::from_json(&json!({})).unwrap();
        assert_eq!(opts, HelloOptions::default());
    }

    #[test]
    fn test_recognized_fields() {
        let opts = HelloOptions::from_json(&json!({ "louder": true, "buffer": true })).unwrap();
        assert!(opts.louder);
        assert!(opts.buffer);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let opts = HelloOptions::from_json(&json!({ "quieter": 1, "louder": false })).unwrap();
        assert_eq!(opts, HelloOptions::new(false, false));
    }

    #[test]
    fn test_non_object_rejected() {
        for value in [json!("louder"), json!(1), json!(null), json!(true)] {
            let err = HelloOptions::from_json(&value).unwrap_err();
            assert_eq!(err.to_string(), OPTIONS_NOT_OBJECT);
        }
    }

    #[test]
    fn test_array_counts_as_object() {
        assert_eq!(
            HelloOptions::from_json(&json!([1, 2])).unwrap(),
            HelloOptions::default()
        );
    }

    #[test]
    fn test_non_boolean_louder() {
        let err = HelloOptions::from_json(&json!({ "louder": "yes" })).unwrap_err();
        assert_eq!(err.to_string(), "option 'louder' must be a boolean");
    }

    #[test]
    fn test_non_boolean_buffer() {
        let err = HelloOptions::from_json(&json!({ "buffer": null })).unwrap_err();
        assert_eq!(err.to_string(), "option 'buffer' must be a boolean");
    }

    #[test]
    fn test_louder_checked_before_buffer() {
        let err = HelloOptions::from_fields(OptionValue::Other("number"), OptionValue::Other("string"))
            .unwrap_err();
        assert_eq!(err.to_string(), "option 'louder' must be a boolean");
    }
}
