//! Per-channel metrics

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counters for one output channel
///
/// Updated by the caller (enqueue) and by the channel worker (everything
/// else), read through `snapshot`.
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    /// Lines handed to the channel
    pub lines_enqueued: AtomicU64,

    /// Lines handed to the destination
    pub lines_written: AtomicU64,

    /// Bytes that reached the underlying writer
    pub bytes_written: AtomicU64,

    /// Physical writes (batches for the file channel)
    pub writes: AtomicU64,

    /// Times the worker waited for the destination to drain
    pub backpressure_waits: AtomicU64,

    /// Size rotations performed
    pub rotations: AtomicU64,

    /// Daily rollovers performed
    pub rollovers: AtomicU64,

    /// Failed attempts to open the destination
    pub open_failures: AtomicU64,

    /// Writes that failed after all retries
    pub write_errors: AtomicU64,

    /// Whether a destination handle is currently open
    pub destination_open: AtomicBool,
}

impl ChannelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_enqueued(&self) {
        self.lines_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch accepted by the destination
    #[inline]
    pub fn record_write(&self, lines: u64) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.lines_written.fetch_add(lines, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_bytes(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_backpressure(&self) {
        self.backpressure_waits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rollover(&self) {
        self.rollovers.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_open_failure(&self) {
        self.open_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_destination_open(&self, open: bool) {
        self.destination_open.store(open, Ordering::Relaxed);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> ChannelMetricsSnapshot {
        ChannelMetricsSnapshot {
            lines_enqueued: self.lines_enqueued.load(Ordering::Relaxed),
            lines_written: self.lines_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            backpressure_waits: self.backpressure_waits.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            rollovers: self.rollovers.load(Ordering::Relaxed),
            open_failures: self.open_failures.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            destination_open: self.destination_open.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of channel metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelMetricsSnapshot {
    pub lines_enqueued: u64,
    pub lines_written: u64,
    pub bytes_written: u64,
    pub writes: u64,
    pub backpressure_waits: u64,
    pub rotations: u64,
    pub rollovers: u64,
    pub open_failures: u64,
    pub write_errors: u64,
    pub destination_open: bool,
}

impl ChannelMetricsSnapshot {
    /// Lines enqueued but not yet handed to the destination
    pub fn pending_lines(&self) -> u64 {
        self.lines_enqueued.saturating_sub(self.lines_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = ChannelMetrics::new();
        for _ in 0..5 {
            metrics.record_enqueued();
        }
        metrics.record_write(3);
        metrics.record_bytes(120);
        metrics.record_backpressure();
        metrics.record_rotation();
        metrics.set_destination_open(true);

        let snap = metrics.snapshot();
        assert_eq!(snap.lines_enqueued, 5);
        assert_eq!(snap.lines_written, 3);
        assert_eq!(snap.pending_lines(), 2);
        assert_eq!(snap.bytes_written, 120);
        assert_eq!(snap.writes, 1);
        assert_eq!(snap.backpressure_waits, 1);
        assert_eq!(snap.rotations, 1);
        assert!(snap.destination_open);
    }

    #[test]
    fn test_default_snapshot_is_zero() {
        let snap = ChannelMetrics::new().snapshot();
        assert_eq!(snap, ChannelMetricsSnapshot::default());
    }
}
