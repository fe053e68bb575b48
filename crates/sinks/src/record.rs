//! Log records
//!
//! A record is captured once at the call site and rendered to the JSON
//! text that follows `"message":` in every line. The shape is decided here,
//! so the channel workers only ever see finished strings.

use std::error::Error as StdError;
use std::io;

use serde::Serialize;
use serde_json::{Map, Value};

/// Message written when an error record carries no message, stack or code
pub const EMPTY_ERROR_MESSAGE: &str =
    "Received an Error, but no data was provided in this error object!";

/// Message written when a value cannot be serialized
pub const UNSUPPORTED_RECORD_MESSAGE: &str =
    "[Error: Unable to format log as the type of log is not supported please check diagnostics]";

/// A value supplied by the application
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    /// String, number, boolean or null
    Scalar(Value),
    /// Key/value object (insertion order is kept)
    Mapping(Map<String, Value>),
    /// Ordered list
    Sequence(Vec<Value>),
    /// Error-like object
    Error(ErrorRecord),
}

/// Error-like record, rendered as
/// `{"error_message":..,"error_stack":..,"error_code":..}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    #[serde(rename = "error_message", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "error_stack", skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(rename = "error_code", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.message.is_none() && self.stack.is_none() && self.code.is_none()
    }
}

impl LogRecord {
    /// Capture any serializable value
    ///
    /// Values that fail to serialize are replaced by a placeholder message
    /// and reported on the diagnostic channel.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::from(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    record_type = std::any::type_name::<T>(),
                    "unable to format log record"
                );
                Self::Scalar(Value::String(UNSUPPORTED_RECORD_MESSAGE.into()))
            }
        }
    }

    /// Capture an error with its source chain
    ///
    /// The chain of `source()` errors becomes the stack. I/O errors also
    /// record their kind as the code.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut stack = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        let code = err
            .downcast_ref::<io::Error>()
            .map(|e| format!("{:?}", e.kind()));

        let message = err.to_string();
        Self::Error(ErrorRecord {
            message: (!message.is_empty()).then_some(message),
            stack: (!stack.is_empty()).then(|| stack.join("\n")),
            code,
        })
    }

    /// JSON text for the `message` field
    pub fn to_json(&self) -> String {
        let rendered = match self {
            Self::Scalar(value) => Ok(value.to_string()),
            Self::Mapping(map) => serde_json::to_string(map),
            Self::Sequence(items) => serde_json::to_string(items),
            Self::Error(err) if err.is_empty() => serde_json::to_string(EMPTY_ERROR_MESSAGE),
            Self::Error(err) => serde_json::to_string(err),
        };

        rendered.unwrap_or_else(|e| {
            tracing::error!(error = %e, "unable to format log record");
            format!("\"{}\"", UNSUPPORTED_RECORD_MESSAGE)
        })
    }
}

impl From<Value> for LogRecord {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Mapping(map),
            Value::Array(items) => Self::Sequence(items),
            scalar => Self::Scalar(scalar),
        }
    }
}

impl From<Map<String, Value>> for LogRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self::Mapping(map)
    }
}

impl From<Vec<Value>> for LogRecord {
    fn from(items: Vec<Value>) -> Self {
        Self::Sequence(items)
    }
}

impl From<ErrorRecord> for LogRecord {
    fn from(err: ErrorRecord) -> Self {
        Self::Error(err)
    }
}

impl From<&str> for LogRecord {
    fn from(s: &str) -> Self {
        Self::Scalar(Value::String(s.to_string()))
    }
}

impl From<String> for LogRecord {
    fn from(s: String) -> Self {
        Self::Scalar(Value::String(s))
    }
}

impl From<bool> for LogRecord {
    fn from(b: bool) -> Self {
        Self::Scalar(Value::Bool(b))
    }
}

impl From<i64> for LogRecord {
    fn from(n: i64) -> Self {
        Self::Scalar(Value::from(n))
    }
}

impl From<u64> for LogRecord {
    fn from(n: u64) -> Self {
        Self::Scalar(Value::from(n))
    }
}

impl From<f64> for LogRecord {
    fn from(n: f64) -> Self {
        Self::Scalar(Value::from(n))
    }
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;
