//! Log sink
//!
//! One [`LogSink`] per named stream. It serializes each record once, stamps
//! it with a single timestamp and hands the resulting lines to its file and
//! terminal channels.
//!
//! ```text
//!                   ┌──> [file channel]     --> <base_dir>/<stream>_<date>.log
//! log(record) ──────┤
//!                   └──> [terminal channel] --> stdout (colored or raw)
//! ```
//!
//! Construction validates the options and spawns one worker per enabled
//! channel, so it must run inside a tokio runtime. The file worker creates
//! the directory and probes today's file size before its first write; lines
//! logged in the meantime wait in its inbox.
//!
//! # Example
//!
//! ```no_run
//! use spool_sinks::{LogSink, SinkSettings, StreamOptions};
//!
//! # async fn run() -> spool_sinks::Result<()> {
//! let sink = LogSink::new(SinkSettings::new(".logs"), StreamOptions::new("api"))?;
//! sink.log(serde_json::json!({"event": "started"}));
//! sink.flush_all().await;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use spool_config::{GlobalConfig, StreamConfig, StreamLevel, TerminalColor};
use tokio::task::JoinHandle;

use crate::channel::{
    ChannelHandle, ChannelKind, ChannelMetrics, ChannelMetricsSnapshot, FileDriver, NullOpener,
    OpenWriter, RetryPolicy, StdoutOpener, TerminalDriver, spawn_channel,
};
use crate::clock::{SharedClock, SystemClock};
use crate::error::{Result, SinkError};
use crate::format::{LineFormatter, TerminalStyle};
use crate::record::LogRecord;

/// Terminal channel high-water mark
pub const TERMINAL_HIGH_WATER_MARK: usize = 16 * 1024;

/// Per-stream options
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    pub name: String,
    pub level: Option<StreamLevel>,
    /// Size at which the active file is rotated
    pub max_file_bytes: u64,
    pub text_color: Option<TerminalColor>,
    pub bg_color: Option<TerminalColor>,
    /// Drop `logTime`/`hostname`/`pid` and discard terminal output
    pub benchmark: bool,
    pub to_file: bool,
    pub to_terminal: bool,
    /// Compact uncolored terminal lines with epoch-millisecond timestamps
    pub terminal_raw: bool,
}

impl StreamOptions {
    /// Defaults for a stream: file and colored terminal output, 250 MB files
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(&StreamConfig::named(name))
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self {
            name: config.name.clone(),
            level: config.level.clone(),
            max_file_bytes: config.max_size_bytes(),
            text_color: config.text_color,
            bg_color: config.bg_color,
            benchmark: config.benchmark,
            to_file: config.to_file,
            to_terminal: config.to_terminal,
            terminal_raw: config.terminal_raw,
        }
    }

    pub fn with_level(mut self, level: impl Into<StreamLevel>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    pub fn with_colors(mut self, text: Option<TerminalColor>, bg: Option<TerminalColor>) -> Self {
        self.text_color = text;
        self.bg_color = bg;
        self
    }

    pub fn with_benchmark(mut self, benchmark: bool) -> Self {
        self.benchmark = benchmark;
        self
    }

    pub fn with_file(mut self, enabled: bool) -> Self {
        self.to_file = enabled;
        self
    }

    pub fn with_terminal(mut self, enabled: bool) -> Self {
        self.to_terminal = enabled;
        self
    }

    pub fn with_raw_terminal(mut self, raw: bool) -> Self {
        self.terminal_raw = raw;
        self
    }

    fn validate(&self) -> Result<()> {
        spool_config::validate_stream_name(&self.name)?;
        if let Some(level) = &self.level
            && !level.is_valid()
        {
            return Err(SinkError::config(format!(
                "stream '{}': level must be a non-empty string or a non-negative number",
                self.name
            )));
        }
        if self.max_file_bytes == 0 {
            return Err(SinkError::config(format!(
                "stream '{}': max file size must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

/// Settings shared by every stream of a process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSettings {
    pub base_dir: PathBuf,
    /// File channel write buffer (high-water mark) in bytes
    pub buffer_bytes: usize,
    pub retry: RetryPolicy,
}

impl SinkSettings {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            buffer_bytes: spool_config::DEFAULT_BUFFER_SIZE_KB * 1024,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            base_dir: global.base_dir_path(),
            buffer_bytes: global.buffer_size_bytes(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_buffer_bytes(mut self, bytes: usize) -> Self {
        self.buffer_bytes = bytes;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Builder for [`LogSink`]
pub struct LogSinkBuilder {
    settings: SinkSettings,
    options: StreamOptions,
    clock: SharedClock,
    terminal_writer: Option<Arc<dyn OpenWriter>>,
}

impl LogSinkBuilder {
    pub fn new(settings: SinkSettings, options: StreamOptions) -> Self {
        Self {
            settings,
            options,
            clock: SystemClock::shared(),
            terminal_writer: None,
        }
    }

    /// Use `clock` for timestamps and the file date
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Send terminal output to `opener` instead of stdout
    pub fn with_terminal_writer(mut self, opener: Arc<dyn OpenWriter>) -> Self {
        self.terminal_writer = Some(opener);
        self
    }

    /// Validate the options and start the channel workers
    pub fn build(self) -> Result<LogSink> {
        let Self {
            settings,
            options,
            clock,
            terminal_writer,
        } = self;

        options.validate()?;
        if settings.buffer_bytes == 0 {
            return Err(SinkError::config("write buffer size must be positive"));
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(SinkError::init("log sinks must be created inside a tokio runtime"));
        }

        let name: Arc<str> = options.name.as_str().into();
        let mut tasks = Vec::new();

        let file = options.to_file.then(|| {
            let metrics = Arc::new(ChannelMetrics::new());
            let driver = FileDriver::new(
                Arc::clone(&name),
                settings.base_dir.clone(),
                options.max_file_bytes,
                Arc::clone(&clock),
                Arc::clone(&metrics),
            )
            .with_buffer_bytes(settings.buffer_bytes)
            .with_retry(settings.retry);
            let (handle, task) = spawn_channel(
                ChannelKind::File,
                Arc::clone(&name),
                driver,
                metrics,
                settings.retry,
            );
            tasks.push(task);
            handle
        });

        let terminal = options.to_terminal.then(|| {
            let opener: Arc<dyn OpenWriter> = match terminal_writer {
                Some(opener) => opener,
                None if options.benchmark => Arc::new(NullOpener),
                None => Arc::new(StdoutOpener),
            };
            let kind = if options.terminal_raw {
                ChannelKind::RawTerminal
            } else {
                ChannelKind::Terminal
            };
            let metrics = Arc::new(ChannelMetrics::new());
            let driver = TerminalDriver::new(
                Arc::clone(&name),
                opener,
                TERMINAL_HIGH_WATER_MARK,
                settings.retry,
                Arc::clone(&metrics),
            );
            let (handle, task) =
                spawn_channel(kind, Arc::clone(&name), driver, metrics, settings.retry);
            tasks.push(task);
            handle
        });

        let style = if options.terminal_raw {
            TerminalStyle::plain()
        } else {
            TerminalStyle::new(options.text_color, options.bg_color)
        };

        tracing::debug!(
            stream = %name,
            dir = %settings.base_dir.display(),
            file = options.to_file,
            terminal = options.to_terminal,
            raw = options.terminal_raw,
            "log sink started"
        );

        Ok(LogSink {
            formatter: LineFormatter::for_current_process(
                options.level.as_ref(),
                options.benchmark,
            ),
            name,
            style,
            clock,
            file,
            terminal,
            tasks,
        })
    }
}

/// Per-channel metrics of one sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSinkMetrics {
    pub file: Option<ChannelMetricsSnapshot>,
    pub terminal: Option<ChannelMetricsSnapshot>,
}

/// Writes the records of one named stream
///
/// Dropping the sink lets each worker write what it has queued, close its
/// destination and exit. Await [`LogSink::flush_all`] or
/// [`LogSink::shutdown`] to know when that has happened.
pub struct LogSink {
    name: Arc<str>,
    formatter: LineFormatter,
    style: TerminalStyle,
    clock: SharedClock,
    file: Option<ChannelHandle>,
    terminal: Option<ChannelHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl LogSink {
    /// Build a sink with the system clock and stdout
    pub fn new(settings: SinkSettings, options: StreamOptions) -> Result<Self> {
        LogSinkBuilder::new(settings, options).build()
    }

    pub fn builder(settings: SinkSettings, options: StreamOptions) -> LogSinkBuilder {
        LogSinkBuilder::new(settings, options)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write `record` to every enabled channel
    ///
    /// All channels get the same timestamp. Never blocks and never fails;
    /// I/O problems are reported through `tracing` and retried.
    pub fn log(&self, record: impl Into<LogRecord>) {
        let message = record.into().to_json();
        let now = self.clock.now();

        if let Some(file) = &self.file {
            file.enqueue(self.formatter.file_line(&now, &message));
        }
        if let Some(terminal) = &self.terminal {
            terminal.enqueue(self.terminal_line(terminal, &now, &message));
        }
    }

    /// Write `record` to the file channel only
    ///
    /// Returns false if the stream has no file output.
    pub fn file(&self, record: impl Into<LogRecord>) -> bool {
        let Some(file) = &self.file else {
            return false;
        };
        let message = record.into().to_json();
        file.enqueue(self.formatter.file_line(&self.clock.now(), &message))
    }

    /// Write `record` to the terminal channel only
    ///
    /// Returns false if the stream has no terminal output.
    pub fn terminal(&self, record: impl Into<LogRecord>) -> bool {
        let Some(terminal) = &self.terminal else {
            return false;
        };
        let message = record.into().to_json();
        terminal.enqueue(self.terminal_line(terminal, &self.clock.now(), &message))
    }

    fn terminal_line(
        &self,
        terminal: &ChannelHandle,
        now: &chrono::DateTime<chrono::Local>,
        message: &str,
    ) -> String {
        match terminal.kind() {
            ChannelKind::RawTerminal => self.formatter.raw_line(now, message),
            _ => self.formatter.terminal_line(now, message, &self.style),
        }
    }

    /// Resolves when the file channel is drained and its file closed
    pub async fn flush(&self) {
        if let Some(file) = &self.file {
            file.flush().await;
        }
    }

    /// Resolves when the terminal channel is drained
    pub async fn flush_terminal(&self) {
        if let Some(terminal) = &self.terminal {
            terminal.flush().await;
        }
    }

    /// Flush every channel
    pub async fn flush_all(&self) {
        let file = self.file.as_ref().map(ChannelHandle::flush);
        let terminal = self.terminal.as_ref().map(ChannelHandle::flush);
        if let Some(file) = file {
            file.await;
        }
        if let Some(terminal) = terminal {
            terminal.await;
        }
    }

    /// Stop accepting records and wait for the workers to finish
    pub async fn shutdown(self) {
        let Self {
            name, file, terminal, tasks, ..
        } = self;
        drop(file);
        drop(terminal);

        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(stream = %name, error = %e, "channel worker failed");
            }
        }
        tracing::debug!(stream = %name, "log sink stopped");
    }

    pub fn metrics(&self) -> LogSinkMetrics {
        LogSinkMetrics {
            file: self.file.as_ref().map(ChannelHandle::metrics),
            terminal: self.terminal.as_ref().map(ChannelHandle::metrics),
        }
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("name", &self.name)
            .field("file", &self.file.is_some())
            .field("terminal", &self.terminal.as_ref().map(ChannelHandle::kind))
            .finish()
    }
}
