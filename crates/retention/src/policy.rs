//! Retention age policy

use std::collections::HashMap;

use spool_config::MaxAge;

/// Maximum file age per stream
///
/// Stream names are matched case-insensitively. An age of 0 keeps a
/// stream's files forever, as does having no entry and no default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    per_stream: HashMap<String, u32>,
    default_days: Option<u32>,
}

impl RetentionPolicy {
    /// Same maximum age for every stream
    pub fn uniform(days: u32) -> Self {
        Self {
            per_stream: HashMap::new(),
            default_days: Some(days),
        }
    }

    /// Per-stream ages with an optional fallback
    pub fn per_stream<I, S>(entries: I, default_days: Option<u32>) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        Self {
            per_stream: entries
                .into_iter()
                .map(|(name, days)| (name.as_ref().to_lowercase(), days))
                .collect(),
            default_days,
        }
    }

    pub fn from_max_age(max_age: &MaxAge) -> Self {
        match max_age {
            MaxAge::Days(days) => Self::uniform(*days),
            MaxAge::PerStream(_) => Self::per_stream(max_age.per_stream(), max_age.default_days()),
        }
    }

    /// Age in days after which `stream` files are deleted, `None` to keep them
    pub fn max_age_for(&self, stream: &str) -> Option<u32> {
        let days = self
            .per_stream
            .get(&stream.to_lowercase())
            .copied()
            .or(self.default_days)?;
        (days > 0).then_some(days)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_uniform() {
        let policy = RetentionPolicy::uniform(30);
        assert_eq!(policy.max_age_for("api"), Some(30));
        assert_eq!(policy.max_age_for("anything"), Some(30));
    }

    #[test]
    fn test_per_stream_with_default() {
        let policy = RetentionPolicy::per_stream([("API", 7), ("audit", 0)], Some(30));
        assert_eq!(policy.max_age_for("api"), Some(7));
        assert_eq!(policy.max_age_for("Api"), Some(7));
        assert_eq!(policy.max_age_for("audit"), None);
        assert_eq!(policy.max_age_for("web"), Some(30));
    }

    #[test]
    fn test_per_stream_without_default() {
        let policy = RetentionPolicy::per_stream([("api", 7)], None);
        assert_eq!(policy.max_age_for("api"), Some(7));
        assert_eq!(policy.max_age_for("web"), None);
    }

    #[test]
    fn test_zero_default_keeps_everything() {
        let policy = RetentionPolicy::uniform(0);
        assert_eq!(policy.max_age_for("api"), None);
    }

    #[test]
    fn test_from_max_age() {
        let policy = RetentionPolicy::from_max_age(&MaxAge::Days(14));
        assert_eq!(policy, RetentionPolicy::uniform(14));

        let map = BTreeMap::from([
            ("api".to_string(), 7),
            ("default".to_string(), 60),
        ]);
        let policy = RetentionPolicy::from_max_age(&MaxAge::PerStream(map));
        assert_eq!(policy.max_age_for("api"), Some(7));
        assert_eq!(policy.max_age_for("web"), Some(60));
        assert_eq!(policy.max_age_for("default"), Some(60));
    }
}
