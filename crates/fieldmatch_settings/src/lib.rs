use fieldmatch_types::ComparisonSettings;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

pub mod comparison;
pub mod error;

pub use comparison::comparison_from_lookup;
pub use error::SettingsError;

pub const PARALLEL_MIN_RECORDS_KEY: &str = "FIELDMATCH_PARALLEL_MIN_RECORDS";
pub const LOG_LEVEL_KEY: &str = "LOG_LEVEL";
pub const LOG_JSON_KEY: &str = "LOG_JSON";

const DEFAULT_PARALLEL_MIN_RECORDS: usize = 256;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Reads `key` through `lookup` and parses it. Unset or blank values are `None`.
pub(crate) fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, SettingsError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SettingsError::InvalidValue {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSettings {
    /// An `EnvFilter` directive, e.g. `info` or `fieldmatch_evaluate=debug`
    pub level: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelSettings {
    /// Batches smaller than this are evaluated on the calling thread
    pub min_records: usize,
}

impl Default for ParallelSettings {
    fn default() -> Self {
        Self {
            min_records: DEFAULT_PARALLEL_MIN_RECORDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldmatchConfig {
    pub comparison: ComparisonSettings,
    pub parallel: ParallelSettings,
    pub log: LogSettings,
}

impl Default for FieldmatchConfig {
    fn default() -> Self {
        Self {
            comparison: ComparisonSettings::default(),
            parallel: ParallelSettings::default(),
            log: LogSettings::default(),
        }
    }
}

impl FieldmatchConfig {
    /// Builds the configuration from process environment variables
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so callers and tests can
    /// supply values without touching the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let comparison = comparison_from_lookup(&lookup)?;

        let parallel = ParallelSettings {
            min_records: parse_var(&lookup, PARALLEL_MIN_RECORDS_KEY)?
                .unwrap_or(DEFAULT_PARALLEL_MIN_RECORDS),
        };

        let log = LogSettings {
            level: lookup(LOG_LEVEL_KEY)
                .filter(|level| !level.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            json: parse_var(&lookup, LOG_JSON_KEY)?.unwrap_or(false),
        };

        let config = Self {
            comparison,
            parallel,
            log,
        };
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::{LIST_MAX_EXTRA_KEY, STRING_OVERLAP_KEY};
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = FieldmatchConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, FieldmatchConfig::default());
    }

    #[test]
    fn test_values_from_lookup() {
        let config = FieldmatchConfig::from_lookup(lookup_from(&[
            (STRING_OVERLAP_KEY, "0.5"),
            (LIST_MAX_EXTRA_KEY, " 3 "),
            (PARALLEL_MIN_RECORDS_KEY, "16"),
            (LOG_LEVEL_KEY, "debug"),
            (LOG_JSON_KEY, "true"),
        ]))
        .unwrap();

        assert_eq!(config.comparison.string_overlap, 0.5);
        assert_eq!(config.comparison.list_max_extra, 3);
        assert_eq!(config.parallel.min_records, 16);
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config =
            FieldmatchConfig::from_lookup(lookup_from(&[(STRING_OVERLAP_KEY, "  ")])).unwrap();
        assert_eq!(config.comparison, ComparisonSettings::default());
    }

    #[test]
    fn test_unparseable_value_fails() {
        let err = FieldmatchConfig::from_lookup(lookup_from(&[(LIST_MAX_EXTRA_KEY, "-1")]))
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidValue {
                key: LIST_MAX_EXTRA_KEY,
                ..
            }
        ));
    }

    #[test]
    fn test_out_of_range_threshold_fails() {
        let err = FieldmatchConfig::from_lookup(lookup_from(&[(STRING_OVERLAP_KEY, "1.2")]))
            .unwrap_err();
        assert!(matches!(err, SettingsError::SchemaError(_)));
    }
}
