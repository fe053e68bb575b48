//! Sink error types
//!
//! Only construction-time problems surface to callers. Runtime I/O failures
//! stay inside the channel workers and are reported through `tracing`.

use thiserror::Error;

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors returned by sink construction and helpers
#[derive(Debug, Error)]
pub enum SinkError {
    /// Invalid stream options or settings
    #[error("configuration error: {0}")]
    Config(String),

    /// Sink could not be started
    #[error("failed to initialize sink: {0}")]
    Init(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an initialization error
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }
}

impl From<spool_config::ConfigError> for SinkError {
    fn from(err: spool_config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SinkError::config("bad name").to_string(),
            "configuration error: bad name"
        );
        assert_eq!(
            SinkError::init("no runtime").to_string(),
            "failed to initialize sink: no runtime"
        );
    }

    #[test]
    fn test_from_config_error() {
        let err: SinkError = spool_config::ConfigError::missing_field("stream", "", "name").into();
        assert!(matches!(err, SinkError::Config(_)));
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_from_io_error() {
        let err: SinkError = std::io::Error::other("disk").into();
        assert!(matches!(err, SinkError::Io(_)));
    }
}
