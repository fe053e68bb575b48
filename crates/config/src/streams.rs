//! Per-stream configuration
//!
//! A stream is one named log (e.g. `api`, `worker`). Each stream gets its
//! own file under the base directory and, optionally, terminal output.

use std::fmt;

use serde::Deserialize;

/// Default maximum size of one log file (MB)
pub const DEFAULT_MAX_SIZE_MB: u64 = 250;

/// Level label written into every line of a stream
///
/// Either a name (`"info"`, `"audit"`) or a non-negative number.
/// Whole numbers deserialize as [`StreamLevel::Number`], anything else
/// numeric as [`StreamLevel::Fraction`].
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StreamLevel {
    Number(u64),
    Fraction(f64),
    Name(String),
}

impl StreamLevel {
    /// Non-empty name, or a finite number that is not negative
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Number(_) => true,
            Self::Fraction(n) => n.is_finite() && *n >= 0.0,
            Self::Name(s) => !s.trim().is_empty(),
        }
    }
}

impl fmt::Display for StreamLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Fraction(n) => write!(f, "{}", n),
            Self::Name(s) => f.write_str(s),
        }
    }
}

impl From<&str> for StreamLevel {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<u64> for StreamLevel {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<f64> for StreamLevel {
    fn from(n: f64) -> Self {
        Self::Fraction(n)
    }
}

/// Terminal color names accepted for `text_color` / `bg_color`
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminalColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

/// Configuration for one log stream
///
/// # Example
///
/// ```toml
/// [[streams]]
/// name = "api"
/// level = "info"
/// max_size_mb = 100
/// text_color = "green"
/// to_terminal = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Stream name, used as the file name prefix
    /// Required
    pub name: String,

    /// Optional level label
    pub level: Option<StreamLevel>,

    /// Rotate the active file once it reaches this size (MB)
    /// Default: 250
    pub max_size_mb: u64,

    /// Terminal text color
    pub text_color: Option<TerminalColor>,

    /// Terminal background color
    pub bg_color: Option<TerminalColor>,

    /// Drop hostname/pid/time metadata and send terminal output to the null device
    /// Default: false
    pub benchmark: bool,

    /// Write lines to the stream's log file
    /// Default: true
    pub to_file: bool,

    /// Write lines to the terminal
    /// Default: true
    pub to_terminal: bool,

    /// Use the compact uncolored terminal format with epoch-millisecond times
    /// Default: false
    pub terminal_raw: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            level: None,
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            text_color: None,
            bg_color: None,
            benchmark: false,
            to_file: true,
            to_terminal: true,
            terminal_raw: false,
        }
    }
}

impl StreamConfig {
    /// Create a stream config with defaults for everything but the name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Maximum file size in bytes
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}
