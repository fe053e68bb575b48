//! Retention configuration
//!
//! Controls when aged log files are deleted and how old "aged" is.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Default cron schedule: every day at 00:05
pub const DEFAULT_SCHEDULE: &str = "5 0 * * *";

/// Default number of files deleted concurrently
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default maximum age (days)
pub const DEFAULT_MAX_AGE_DAYS: u32 = 30;

/// Key of the per-stream table that applies to unlisted streams
pub const DEFAULT_AGE_KEY: &str = "default";

/// Maximum file age in days
///
/// ```toml
/// [retention]
/// max_age = 14
///
/// # or per stream, with an optional fallback:
/// [retention.max_age]
/// api = 7
/// audit = 0      # never delete
/// default = 30
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MaxAge {
    /// Same age for every stream
    Days(u32),
    /// Age per stream name, `default` applies to everything unlisted
    PerStream(BTreeMap<String, u32>),
}

impl Default for MaxAge {
    fn default() -> Self {
        Self::Days(DEFAULT_MAX_AGE_DAYS)
    }
}

impl MaxAge {
    /// Fallback age for streams without an explicit entry
    pub fn default_days(&self) -> Option<u32> {
        match self {
            Self::Days(days) => Some(*days),
            Self::PerStream(map) => map.get(DEFAULT_AGE_KEY).copied(),
        }
    }

    /// Explicit per-stream entries (excluding the `default` key)
    pub fn per_stream(&self) -> impl Iterator<Item = (&str, u32)> {
        let map = match self {
            Self::Days(_) => None,
            Self::PerStream(map) => Some(map),
        };
        map.into_iter()
            .flat_map(|m| m.iter())
            .filter(|(name, _)| name.as_str() != DEFAULT_AGE_KEY)
            .map(|(name, days)| (name.as_str(), *days))
    }
}

/// Retention configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Run the retention scheduler
    /// Default: true
    pub enabled: bool,

    /// Cron expression. Five-field expressions (minute first) are
    /// accepted and run at second 0.
    /// Default: "5 0 * * *"
    pub schedule: String,

    /// Files deleted concurrently per batch
    /// Default: 5
    pub batch_size: usize,

    /// Maximum file age
    /// Default: 30 days for every stream
    pub max_age: MaxAge,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: DEFAULT_SCHEDULE.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_age: MaxAge::default(),
        }
    }
}

impl RetentionConfig {
    /// Schedule in the seconds-first form the cron parser expects
    pub fn cron_expression(&self) -> String {
        normalize_cron(&self.schedule)
    }
}

/// Prefix a five-field cron expression with a seconds field
pub fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RetentionConfig::default();
        assert!(config.enabled);
        assert_eq!(config.schedule, "5 0 * * *");
        assert_eq!(config.cron_expression(), "0 5 0 * * *");
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.max_age, MaxAge::Days(30));
    }

    #[test]
    fn test_uniform_max_age() {
        let config: RetentionConfig = toml::from_str("max_age = 14").unwrap();
        assert_eq!(config.max_age.default_days(), Some(14));
        assert_eq!(config.max_age.per_stream().count(), 0);
    }

    #[test]
    fn test_per_stream_max_age() {
        let toml = r#"
[max_age]
api = 7
audit = 0
default = 30
"#;
        let config: RetentionConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_age.default_days(), Some(30));
        let entries: Vec<_> = config.max_age.per_stream().collect();
        assert_eq!(entries, vec![("api", 7), ("audit", 0)]);
    }

    #[test]
    fn test_per_stream_without_default() {
        let config: RetentionConfig = toml::from_str("[max_age]\napi = 7").unwrap();
        assert_eq!(config.max_age.default_days(), None);
    }

    #[test]
    fn test_non_numeric_age_rejected() {
        assert!(toml::from_str::<RetentionConfig>("[max_age]\napi = \"week\"").is_err());
    }

    #[test]
    fn test_six_field_cron_untouched() {
        assert_eq!(normalize_cron(" 0 */5 * * * * "), "0 */5 * * * *");
    }
}
