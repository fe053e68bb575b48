//! Spool - Sinks
//!
//! Buffered, backpressure-aware log sinks. Each named stream gets a
//! [`LogSink`] that writes JSON lines to rotating files and/or the terminal.
//!
//! # Architecture
//!
//! Every output channel is owned by one tokio task. `LogSink::log` formats
//! a record once and sends the line to each enabled channel's inbox; it
//! never waits on I/O.
//!
//! ```text
//! [LogSink::log] --line--> [file channel]     --> <stream>_<date>.log
//!                --line--> [terminal channel] --> stdout
//! ```
//!
//! The file channel batches lines, rotates the active file once it reaches
//! the configured size (`<stream>_<date>_000.log`, `_001`, ...) and rolls
//! over to a new file when the local date changes.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `record` | Log record shapes and JSON serialization |
//! | `format` | Line layout, timestamps, terminal colors |
//! | `naming` | Active and rotated file names |
//! | `channel` | Channel workers, file and terminal drivers |
//! | `flush` | Shared flush completion signals |
//! | `log_sink` | Per-stream orchestration |

pub mod channel;
pub mod clock;
pub mod error;
pub mod flush;
pub mod format;
pub mod log_sink;
pub mod naming;
pub mod provision;
pub mod record;
pub mod util;

#[cfg(test)]
pub(crate) mod test_util;

pub use channel::{
    ChannelHandle, ChannelKind, ChannelMetrics, ChannelMetricsSnapshot, NullOpener, OpenWriter,
    RetryPolicy, StdoutOpener,
};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{Result, SinkError};
pub use flush::Flushed;
pub use format::{LineFormatter, TerminalStyle};
pub use log_sink::{LogSink, LogSinkBuilder, LogSinkMetrics, SinkSettings, StreamOptions};
pub use naming::{ParsedFileName, active_file_name, indexed_file_name, parse_file_name};
pub use record::{ErrorRecord, LogRecord};
