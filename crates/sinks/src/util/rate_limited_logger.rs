//! Rate-limited error logging
//!
//! A full disk makes every write fail. Logging each failure would flood the
//! diagnostic output, so errors are logged at most once per interval with a
//! count of what was suppressed in between.
//!
//! # Example
//!
//! ```ignore
//! use spool_sinks::util::RateLimitedLogger;
//! use std::time::Duration;
//!
//! let logger = RateLimitedLogger::new("api", Duration::from_secs(10));
//!
//! // Only logs once per 10 seconds, even if called frequently
//! for _ in 0..1000 {
//!     logger.error("write failed", &io_error);
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between logged errors
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Rate-limited logger scoped to one stream
pub struct RateLimitedLogger {
    stream: Arc<str>,
    min_interval: Duration,
    last_log_time: Mutex<Option<Instant>>,
    /// Errors since the last logged one
    error_count: AtomicU64,
    total_errors: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(stream: impl Into<Arc<str>>, min_interval: Duration) -> Self {
        Self {
            stream: stream.into(),
            min_interval,
            last_log_time: Mutex::new(None),
            error_count: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
        }
    }

    /// Logger with the default 10 second interval
    pub fn for_stream(stream: impl Into<Arc<str>>) -> Self {
        Self::new(stream, DEFAULT_LOG_INTERVAL)
    }

    /// Record an error and log it if the interval has passed
    ///
    /// Returns true if the error was logged, false if it was suppressed.
    pub fn error(&self, message: &str, error: &dyn fmt::Display) -> bool {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        let total = self.total_errors.fetch_add(1, Ordering::Relaxed) + 1;

        if !self.interval_elapsed() {
            return false;
        }

        let count = self.error_count.swap(0, Ordering::Relaxed);
        if count > 1 {
            tracing::error!(
                stream = %self.stream,
                error = %error,
                suppressed_count = count - 1,
                total_errors = total,
                "{} (rate-limited)",
                message
            );
        } else {
            tracing::error!(
                stream = %self.stream,
                error = %error,
                total_errors = total,
                "{}",
                message
            );
        }
        true
    }

    fn interval_elapsed(&self) -> bool {
        let mut last_time = self.last_log_time.lock();
        let now = Instant::now();
        match *last_time {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                *last_time = Some(now);
                true
            }
        }
    }

    /// Errors suppressed since the last logged one
    pub fn pending_error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn total_error_count(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for RateLimitedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitedLogger")
            .field("stream", &self.stream)
            .field("min_interval", &self.min_interval)
            .field("total_errors", &self.total_error_count())
            .finish()
    }
}
