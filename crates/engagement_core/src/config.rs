//! Runtime configuration resolved from the host environment.
//!
//! # Invariants
//! - Blank or unparseable values fall back to defaults; resolution never fails.
//! - `recommendation_count` stays within `1..=MAX_RECOMMENDATION_COUNT`.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "ENGAGEMENT_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "ENGAGEMENT_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "ENGAGEMENT_LOG_DIR";
pub const RECOMMENDATION_COUNT_ENV: &str = "ENGAGEMENT_RECOMMENDATION_COUNT";

const DEFAULT_DB_FILE_NAME: &str = "engagement_state.sqlite3";
const DEFAULT_RECOMMENDATION_COUNT: usize = 3;
pub const MAX_RECOMMENDATION_COUNT: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementConfig {
    /// SQLite file backing the key-value store.
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute log directory; `None` leaves logging to the host.
    pub log_dir: Option<PathBuf>,
    /// Items shown per home dashboard recommendation row.
    pub recommendation_count: usize,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            recommendation_count: DEFAULT_RECOMMENDATION_COUNT,
        }
    }
}

impl EngagementConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };
        let defaults = Self::default();

        Self {
            db_path: value(DB_PATH_ENV).map_or(defaults.db_path, PathBuf::from),
            log_level: value(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: value(LOG_DIR_ENV).map(PathBuf::from),
            recommendation_count: value(RECOMMENDATION_COUNT_ENV)
                .and_then(|raw| raw.parse::<usize>().ok())
                .map_or(defaults.recommendation_count, |count| {
                    count.clamp(1, MAX_RECOMMENDATION_COUNT)
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        EngagementConfig, DB_PATH_ENV, LOG_LEVEL_ENV, MAX_RECOMMENDATION_COUNT,
        RECOMMENDATION_COUNT_ENV,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(EngagementConfig::from_lookup(|_| None), EngagementConfig::default());
    }

    #[test]
    fn values_are_trimmed_and_count_is_clamped() {
        let config = EngagementConfig::from_lookup(lookup(&[
            (DB_PATH_ENV, " /data/engagement.db "),
            (LOG_LEVEL_ENV, "warn"),
            (RECOMMENDATION_COUNT_ENV, "500"),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/data/engagement.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.recommendation_count, MAX_RECOMMENDATION_COUNT);
    }

    #[test]
    fn blank_and_garbage_values_fall_back() {
        let config = EngagementConfig::from_lookup(lookup(&[
            (DB_PATH_ENV, "   "),
            (RECOMMENDATION_COUNT_ENV, "many"),
        ]));
        assert_eq!(config, EngagementConfig::default());
    }
}
