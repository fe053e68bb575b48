//! Error types for retention

use std::io;

use thiserror::Error;

/// Result type for retention operations
pub type Result<T> = std::result::Result<T, RetentionError>;

/// Errors that can occur while configuring or running retention
#[derive(Debug, Error)]
pub enum RetentionError {
    /// Cron expression could not be parsed
    #[error("invalid cron schedule: {0}")]
    InvalidSchedule(String),

    /// Batch size or age policy is unusable
    #[error("invalid retention settings: {0}")]
    InvalidSettings(String),

    /// Listing the log directory failed
    #[error("failed to list '{path}': {source}")]
    List {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl From<spool_config::ConfigError> for RetentionError {
    fn from(err: spool_config::ConfigError) -> Self {
        match err {
            spool_config::ConfigError::InvalidSchedule { .. } => {
                Self::InvalidSchedule(err.to_string())
            }
            other => Self::InvalidSettings(other.to_string()),
        }
    }
}
