//! Spool Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use spool_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[[streams]]\nname = \"api\"").unwrap();
//! assert_eq!(config.streams[0].max_size_mb, 250);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [global]
//! base_dir = ".logs"
//! buffer_size_kb = 256
//!
//! [[streams]]
//! name = "api"
//! level = "info"
//! text_color = "green"
//!
//! [[streams]]
//! name = "audit"
//! to_terminal = false
//!
//! [retention]
//! schedule = "5 0 * * *"
//! batch_size = 5
//!
//! [retention.max_age]
//! api = 7
//! audit = 0
//! default = 30
//! ```

mod error;
mod global;
mod logging;
mod retention;
mod streams;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use global::{
    BufferProfile, DEFAULT_BASE_DIR, DEFAULT_BUFFER_SIZE_KB, GlobalConfig, MAX_BUFFER_SIZE_KB,
};
pub use logging::{DiagnosticFormat, DiagnosticLevel, LogConfig};
pub use retention::{
    DEFAULT_AGE_KEY, DEFAULT_BATCH_SIZE, DEFAULT_MAX_AGE_DAYS, DEFAULT_SCHEDULE, MaxAge,
    RetentionConfig, normalize_cron,
};
pub use streams::{DEFAULT_MAX_SIZE_MB, StreamConfig, StreamLevel, TerminalColor};
pub use validation::{validate_base_dir, validate_schedule, validate_stream_name};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global settings (base directory, buffer size)
    pub global: GlobalConfig,

    /// Diagnostic logging configuration
    pub log: LogConfig,

    /// Log streams, one file family each
    pub streams: Vec<StreamConfig>,

    /// Retention schedule and age policy
    pub retention: RetentionConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Find a stream by name
    pub fn stream(&self, name: &str) -> Option<&StreamConfig> {
        self.streams.iter().find(|s| s.name == name)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
