//! Diagnostic logging configuration
//!
//! Controls spool's own diagnostics (open failures, rotations, retention
//! passes). These never go to the log streams themselves.

use serde::Deserialize;

/// Diagnostic log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl DiagnosticLevel {
    /// Level as an `EnvFilter` directive
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Diagnostic output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticFormat {
    /// Human-readable lines (default)
    #[default]
    Console,
    /// One JSON object per event
    Json,
}

/// Diagnostic logging configuration
///
/// # Example
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level (trace, debug, info, warn, error)
    /// Default: info
    pub level: DiagnosticLevel,

    /// Output format (console, json)
    /// Default: console
    pub format: DiagnosticFormat,
}
