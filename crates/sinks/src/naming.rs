//! Log file naming convention
//!
//! ```text
//! <stream>_<YYYY-MM-DD>.log         active file
//! <stream>_<YYYY-MM-DD>_<NNN>.log   rotated file, NNN starts at 000
//! ```
//!
//! Shared by the file channel (creating and rotating) and the retention
//! engine (parsing directory entries).

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Date format embedded in file names
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Extension of every log file
pub const LOG_EXTENSION: &str = ".log";

static LOG_FILE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)_(\d{4}-\d{2}-\d{2})(?:_(\d{3,}))?\.log$").expect("valid file pattern")
});

/// Name of the active file for a stream and date
pub fn active_file_name(stream: &str, date: NaiveDate) -> String {
    format!("{}_{}{}", stream, date.format(DATE_FORMAT), LOG_EXTENSION)
}

/// Name of a rotated file
pub fn indexed_file_name(stream: &str, date: NaiveDate, sequence: u32) -> String {
    format!(
        "{}_{}_{:03}{}",
        stream,
        date.format(DATE_FORMAT),
        sequence,
        LOG_EXTENSION
    )
}

/// Components of a log file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileName {
    /// Stream (logical) name
    pub stream: String,
    /// Date stamp of the file
    pub date: NaiveDate,
    /// Rotation sequence, `None` for the active file
    pub sequence: Option<u32>,
}

impl ParsedFileName {
    /// Whether this is a rotated file
    pub fn is_indexed(&self) -> bool {
        self.sequence.is_some()
    }
}

/// Parse a directory entry name
///
/// Returns `None` for anything that does not follow the convention,
/// including impossible dates such as `2024-02-30`.
pub fn parse_file_name(file_name: &str) -> Option<ParsedFileName> {
    let caps = LOG_FILE_PATTERN.captures(file_name)?;
    let date = NaiveDate::parse_from_str(&caps[2], DATE_FORMAT).ok()?;
    let sequence = match caps.get(3) {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };

    Some(ParsedFileName {
        stream: caps[1].to_string(),
        date,
        sequence,
    })
}
