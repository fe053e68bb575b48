//! Configuration validation
//!
//! Validates config consistency:
//! - Stream names are present, unique and usable as file name prefixes
//! - Stream levels and size limits are usable
//! - The base directory is a safe path
//! - The retention schedule parses and batch/age values are positive

use std::collections::HashMap;
use std::path::{Component, Path};
use std::str::FromStr;

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::global::MAX_BUFFER_SIZE_KB;
use crate::retention::MaxAge;

/// Characters never allowed in the base directory
const UNSAFE_DIR_CHARS: &[char] = &[':', '*', '?', '"', '<', '>', '|'];

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_global(config)?;
    validate_streams(config)?;
    validate_retention(config)?;
    Ok(())
}

fn validate_global(config: &Config) -> Result<()> {
    validate_base_dir(&config.global.base_dir)?;

    if !config.global.auto_tune_buffer && config.global.buffer_size_kb == 0 {
        return Err(ConfigError::invalid_value(
            "global",
            "global",
            "buffer_size_kb",
            "must be greater than zero",
        ));
    }

    if config.global.buffer_size_kb > MAX_BUFFER_SIZE_KB {
        return Err(ConfigError::invalid_value(
            "global",
            "global",
            "buffer_size_kb",
            format!("must be at most {} (1 GB)", MAX_BUFFER_SIZE_KB),
        ));
    }

    Ok(())
}

/// Check a base directory value
pub fn validate_base_dir(base_dir: &str) -> Result<()> {
    if base_dir.trim().is_empty() {
        return Err(ConfigError::missing_field("global", "global", "base_dir"));
    }

    if let Some(c) = base_dir.chars().find(|c| UNSAFE_DIR_CHARS.contains(c)) {
        return Err(ConfigError::invalid_value(
            "global",
            "global",
            "base_dir",
            format!("'{}' contains forbidden character '{}'", base_dir, c),
        ));
    }

    let traverses = Path::new(base_dir)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::CurDir));
    if traverses {
        return Err(ConfigError::invalid_value(
            "global",
            "global",
            "base_dir",
            format!("'{}' must not contain '.' or '..' components", base_dir),
        ));
    }

    Ok(())
}

/// Check a stream name
pub fn validate_stream_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::missing_field("stream", name, "name"));
    }
    if name.contains(['/', '\\']) || name.chars().any(char::is_control) {
        return Err(ConfigError::invalid_value(
            "stream",
            name,
            "name",
            "must not contain path separators or control characters",
        ));
    }
    Ok(())
}

fn validate_streams(config: &Config) -> Result<()> {
    // Retention matches names case-insensitively, so files of "App" and
    // "app" would share one policy entry.
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (index, stream) in config.streams.iter().enumerate() {
        if stream.name.is_empty() {
            return Err(ConfigError::missing_field(
                "stream",
                format!("#{}", index),
                "name",
            ));
        }
        validate_stream_name(&stream.name)?;

        if seen
            .insert(stream.name.to_lowercase(), &stream.name)
            .is_some()
        {
            return Err(ConfigError::duplicate_stream(&stream.name));
        }

        if let Some(level) = &stream.level
            && !level.is_valid()
        {
            return Err(ConfigError::invalid_value(
                "stream",
                &stream.name,
                "level",
                "must be a non-empty string or a non-negative number",
            ));
        }

        if stream.max_size_mb == 0 {
            return Err(ConfigError::invalid_value(
                "stream",
                &stream.name,
                "max_size_mb",
                "must be greater than zero",
            ));
        }
    }

    Ok(())
}

fn validate_retention(config: &Config) -> Result<()> {
    let retention = &config.retention;

    if retention.batch_size == 0 {
        return Err(ConfigError::invalid_value(
            "retention",
            "retention",
            "batch_size",
            "must be greater than zero",
        ));
    }

    if let MaxAge::Days(0) = retention.max_age {
        return Err(ConfigError::invalid_value(
            "retention",
            "retention",
            "max_age",
            "must be a positive number of days",
        ));
    }

    validate_schedule(&retention.cron_expression()).map_err(|e| match e {
        ConfigError::InvalidSchedule { message, .. } => {
            ConfigError::invalid_schedule(&retention.schedule, message)
        }
        other => other,
    })
}

/// Check that a (seconds-first) cron expression parses
pub fn validate_schedule(expression: &str) -> Result<()> {
    cron::Schedule::from_str(expression)
        .map(|_| ())
        .map_err(|e| ConfigError::invalid_schedule(expression, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<Config> {
        Config::from_str(toml)
    }

    #[test]
    fn test_base_dir_rules() {
        assert!(validate_base_dir(".logs").is_ok());
        assert!(validate_base_dir("logs").is_ok());
        assert!(validate_base_dir("/var/log/app").is_ok());
        assert!(validate_base_dir("var/log").is_ok());
        assert!(validate_base_dir("").is_err());
        assert!(validate_base_dir("   ").is_err());
        assert!(validate_base_dir("logs*").is_err());
        assert!(validate_base_dir("a:b").is_err());
        assert!(validate_base_dir("../escape").is_err());
        assert!(validate_base_dir("./logs").is_err());
        assert!(validate_base_dir("logs/../../etc").is_err());
    }

    #[test]
    fn test_stream_name_rules() {
        assert!(validate_stream_name("api").is_ok());
        assert!(validate_stream_name("my.app-2").is_ok());
        assert!(validate_stream_name("").is_err());
        assert!(validate_stream_name("a/b").is_err());
        assert!(validate_stream_name("a\\b").is_err());
        assert!(validate_stream_name("a\nb").is_err());
    }

    #[test]
    fn test_missing_stream_name() {
        let err = parse("[[streams]]\nlevel = \"info\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "name", .. }));
        assert!(err.to_string().contains("#0"));
    }

    #[test]
    fn test_duplicate_stream_case_insensitive() {
        let err = parse("[[streams]]\nname = \"App\"\n[[streams]]\nname = \"app\"").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateStream { .. }));
    }

    #[test]
    fn test_empty_level_rejected() {
        let err = parse("[[streams]]\nname = \"api\"\nlevel = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "level", .. }));
    }

    #[test]
    fn test_numeric_levels() {
        assert!(parse("[[streams]]\nname = \"api\"\nlevel = 2.5").is_ok());
        assert!(parse("[[streams]]\nname = \"api\"\nlevel = 0").is_ok());

        let err = parse("[[streams]]\nname = \"api\"\nlevel = -1").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "level", .. }));
        let err = parse("[[streams]]\nname = \"api\"\nlevel = -0.5").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "level", .. }));
        assert!(parse("[[streams]]\nname = \"api\"\nlevel = nan").is_err());
    }

    #[test]
    fn test_zero_max_size_rejected() {
        let err = parse("[[streams]]\nname = \"api\"\nmax_size_mb = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "max_size_mb", .. }));
    }

    #[test]
    fn test_zero_buffer_rejected_unless_auto_tuned() {
        assert!(parse("[global]\nbuffer_size_kb = 0").is_err());
        assert!(parse("[global]\nbuffer_size_kb = 0\nauto_tune_buffer = true").is_ok());
    }

    #[test]
    fn test_oversized_buffer_rejected() {
        assert!(parse(&format!("[global]\nbuffer_size_kb = {}", MAX_BUFFER_SIZE_KB)).is_ok());

        let err = parse(&format!("[global]\nbuffer_size_kb = {}", 1u64 << 50)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "buffer_size_kb", .. }));
    }

    #[test]
    fn test_retention_rules() {
        assert!(parse("[retention]\nbatch_size = 0").is_err());
        assert!(parse("[retention]\nmax_age = 0").is_err());
        // a zero entry in the table means "keep forever"
        assert!(parse("[retention.max_age]\naudit = 0").is_ok());
    }

    #[test]
    fn test_bad_schedule_reports_original_expression() {
        let err = parse("[retention]\nschedule = \"every night\"").unwrap_err();
        match err {
            ConfigError::InvalidSchedule { expression, .. } => {
                assert_eq!(expression, "every night");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_schedules_accepted() {
        assert!(validate_schedule("0 5 0 * * *").is_ok());
        assert!(parse("[retention]\nschedule = \"*/10 * * * *\"").is_ok());
        assert!(parse("[retention]\nschedule = \"30 */10 * * * *\"").is_ok());
    }
}
