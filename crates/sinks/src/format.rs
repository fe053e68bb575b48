//! Line formatting
//!
//! Every channel writes one JSON object per line:
//!
//! ```text
//! {"level":"info","logTime":"2024-03-10T14:03:07.123","hostname":"web-1","pid":4711,"message":{...}}
//! ```
//!
//! `level` is omitted when the stream has none. Benchmark streams omit
//! `logTime`, `hostname` and `pid`. The raw terminal format carries the
//! epoch millisecond count instead of the local timestamp and never
//! contains color codes.

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use owo_colors::{AnsiColors, OwoColorize, Style};
use serde_json::Value;
use spool_config::{StreamLevel, TerminalColor};

/// Local timestamp format of `logTime`
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Builds serialized lines for one stream
///
/// Everything that does not change per record is rendered once up front.
#[derive(Debug, Clone)]
pub struct LineFormatter {
    /// `"level":...,` or empty
    level_field: String,
    /// JSON-escaped hostname including quotes
    hostname: String,
    pid: u32,
    benchmark: bool,
}

impl LineFormatter {
    pub fn new(level: Option<&StreamLevel>, hostname: &str, pid: u32, benchmark: bool) -> Self {
        let level_field = match level {
            Some(StreamLevel::Name(name)) => {
                format!("\"level\":{},", Value::String(name.clone()))
            }
            Some(StreamLevel::Number(n)) => format!("\"level\":{},", n),
            Some(StreamLevel::Fraction(n)) => format!("\"level\":{},", n),
            None => String::new(),
        };

        Self {
            level_field,
            hostname: Value::String(hostname.to_string()).to_string(),
            pid,
            benchmark,
        }
    }

    /// Formatter for this host and process
    pub fn for_current_process(level: Option<&StreamLevel>, benchmark: bool) -> Self {
        Self::new(level, &current_hostname(), std::process::id(), benchmark)
    }

    /// Line for the file channel
    pub fn file_line(&self, now: &DateTime<Local>, message: &str) -> String {
        self.line(&LogTime::Local(now), message)
    }

    /// Line for the colored terminal channel
    pub fn terminal_line(
        &self,
        now: &DateTime<Local>,
        message: &str,
        style: &TerminalStyle,
    ) -> String {
        match style.style {
            None => self.file_line(now, message),
            Some(style) => {
                let body = self.body(&LogTime::Local(now), message);
                format!("{}\n", body.style(style))
            }
        }
    }

    /// Line for the raw terminal channel
    pub fn raw_line(&self, now: &DateTime<Local>, message: &str) -> String {
        self.line(&LogTime::EpochMillis(now.timestamp_millis()), message)
    }

    fn line(&self, time: &LogTime<'_>, message: &str) -> String {
        let mut line = self.body(time, message);
        line.push('\n');
        line
    }

    fn body(&self, time: &LogTime<'_>, message: &str) -> String {
        let mut out = String::with_capacity(
            self.level_field.len() + self.hostname.len() + message.len() + 80,
        );
        out.push('{');
        out.push_str(&self.level_field);
        if !self.benchmark {
            // write! into a String cannot fail
            let _ = match time {
                LogTime::Local(now) => {
                    write!(out, "\"logTime\":\"{}\",", now.format(LOG_TIME_FORMAT))
                }
                LogTime::EpochMillis(ms) => write!(out, "\"logTime\":\"{}\",", ms),
            };
            let _ = write!(out, "\"hostname\":{},\"pid\":{},", self.hostname, self.pid);
        }
        out.push_str("\"message\":");
        out.push_str(message);
        out.push('}');
        out
    }
}

enum LogTime<'a> {
    Local(&'a DateTime<Local>),
    EpochMillis(i64),
}

/// Host name of this machine, or `unknown`
pub fn current_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Terminal colors of a stream
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalStyle {
    style: Option<Style>,
}

impl TerminalStyle {
    /// Uncolored output
    pub fn plain() -> Self {
        Self::default()
    }

    /// Style from the configured text and background colors
    pub fn new(text: Option<TerminalColor>, background: Option<TerminalColor>) -> Self {
        if text.is_none() && background.is_none() {
            return Self::plain();
        }

        let mut style = Style::new();
        if let Some(color) = text {
            style = style.color(ansi_color(color));
        }
        if let Some(color) = background {
            style = style.on_color(ansi_color(color));
        }
        Self { style: Some(style) }
    }

    pub fn is_plain(&self) -> bool {
        self.style.is_none()
    }
}

fn ansi_color(color: TerminalColor) -> AnsiColors {
    match color {
        TerminalColor::Black => AnsiColors::Black,
        TerminalColor::Red => AnsiColors::Red,
        TerminalColor::Green => AnsiColors::Green,
        TerminalColor::Yellow => AnsiColors::Yellow,
        TerminalColor::Blue => AnsiColors::Blue,
        TerminalColor::Magenta => AnsiColors::Magenta,
        TerminalColor::Cyan => AnsiColors::Cyan,
        TerminalColor::White => AnsiColors::White,
        TerminalColor::BrightBlack => AnsiColors::BrightBlack,
        TerminalColor::BrightRed => AnsiColors::BrightRed,
        TerminalColor::BrightGreen => AnsiColors::BrightGreen,
        TerminalColor::BrightYellow => AnsiColors::BrightYellow,
        TerminalColor::BrightBlue => AnsiColors::BrightBlue,
        TerminalColor::BrightMagenta => AnsiColors::BrightMagenta,
        TerminalColor::BrightCyan => AnsiColors::BrightCyan,
        TerminalColor::BrightWhite => AnsiColors::BrightWhite,
    }
}

#[cfg(test)]
#[path = "format_test.rs"]
mod format_test;
