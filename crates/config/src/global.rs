//! Global configuration settings
//!
//! These settings apply to every stream and to the retention engine.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Default log directory, relative to the working directory
pub const DEFAULT_BASE_DIR: &str = ".logs";

/// Default write buffer size in KB
pub const DEFAULT_BUFFER_SIZE_KB: usize = 256;

/// Largest accepted write buffer size in KB
pub const MAX_BUFFER_SIZE_KB: usize = 1024 * 1024;

/// Global configuration that applies to all streams
///
/// All fields have sensible defaults - you only need to specify what you want to change.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Directory holding the log files. Relative paths resolve against
    /// the working directory.
    /// Default: ".logs"
    pub base_dir: String,

    /// Write buffer size (KB). Each channel flushes once this much is pending.
    /// Default: 256
    pub buffer_size_kb: usize,

    /// Pick the buffer size from the CPU model instead of `buffer_size_kb`
    /// Default: false
    pub auto_tune_buffer: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            base_dir: DEFAULT_BASE_DIR.into(),
            buffer_size_kb: DEFAULT_BUFFER_SIZE_KB,
            auto_tune_buffer: false,
        }
    }
}

impl GlobalConfig {
    /// Resolve the base directory to a path
    pub fn base_dir_path(&self) -> PathBuf {
        let dir = Path::new(&self.base_dir);
        if dir.is_absolute() {
            return dir.to_path_buf();
        }
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(dir),
            Err(_) => dir.to_path_buf(),
        }
    }

    /// Get the effective write buffer size in bytes
    ///
    /// Runs CPU detection when `auto_tune_buffer` is set.
    pub fn buffer_size_bytes(&self) -> usize {
        let kb = if self.auto_tune_buffer {
            let profile = BufferProfile::detect();
            tracing::info!(
                profile = profile.as_str(),
                buffer_kb = profile.buffer_size_kb(),
                "write buffer auto-tuned"
            );
            profile.buffer_size_kb()
        } else {
            self.buffer_size_kb
        };
        kb.saturating_mul(1024)
    }
}

/// CPU class used to pick a write buffer size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferProfile {
    /// Entry-level CPUs: 64KB
    Budget,
    /// Mid-range CPUs: 128KB
    Balanced,
    /// High-end desktop/server CPUs: 256KB
    Extreme,
}

static EXTREME_CPU: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[iR][79]-|(?i:max|ultra|threadripper|epyc)").expect("valid cpu pattern")
});

static BALANCED_CPU: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[iR]5-|Apple M[1-3]").expect("valid cpu pattern"));

impl BufferProfile {
    /// Classify a CPU brand string
    pub fn from_cpu_brand(brand: &str) -> Self {
        if EXTREME_CPU.is_match(brand) {
            Self::Extreme
        } else if BALANCED_CPU.is_match(brand) {
            Self::Balanced
        } else {
            Self::Budget
        }
    }

    /// Detect the profile of the host CPU
    pub fn detect() -> Self {
        let system = sysinfo::System::new_all();
        system
            .cpus()
            .first()
            .map(|cpu| Self::from_cpu_brand(cpu.brand()))
            .unwrap_or(Self::Budget)
    }

    /// Buffer size for this profile
    pub fn buffer_size_kb(&self) -> usize {
        match self {
            Self::Budget => 64,
            Self::Balanced => 128,
            Self::Extreme => 256,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Balanced => "balanced",
            Self::Extreme => "extreme",
        }
    }
}
