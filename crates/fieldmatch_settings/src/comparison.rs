use crate::error::SettingsError;
use crate::parse_var;
use fieldmatch_types::ComparisonSettings;

pub const STRING_OVERLAP_KEY: &str = "FIELDMATCH_STRING_OVERLAP";
pub const LIST_MIN_COVERAGE_KEY: &str = "FIELDMATCH_LIST_MIN_COVERAGE";
pub const LIST_MAX_EXTRA_KEY: &str = "FIELDMATCH_LIST_MAX_EXTRA";
pub const NUMERIC_RELATIVE_TOLERANCE_KEY: &str = "FIELDMATCH_NUMERIC_RELATIVE_TOLERANCE";
pub const NUMERIC_ABSOLUTE_TOLERANCE_KEY: &str = "FIELDMATCH_NUMERIC_ABSOLUTE_TOLERANCE";

/// Base comparison thresholds, before schema defaults and field overrides
/// are layered on top
pub fn comparison_from_lookup<F>(lookup: &F) -> Result<ComparisonSettings, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ComparisonSettings::default();

    let settings = ComparisonSettings {
        string_overlap: parse_var(lookup, STRING_OVERLAP_KEY)?.unwrap_or(defaults.string_overlap),
        list_min_coverage: parse_var(lookup, LIST_MIN_COVERAGE_KEY)?
            .unwrap_or(defaults.list_min_coverage),
        list_max_extra: parse_var(lookup, LIST_MAX_EXTRA_KEY)?.unwrap_or(defaults.list_max_extra),
        numeric_relative_tolerance: parse_var(lookup, NUMERIC_RELATIVE_TOLERANCE_KEY)?
            .unwrap_or(defaults.numeric_relative_tolerance),
        numeric_absolute_tolerance: parse_var(lookup, NUMERIC_ABSOLUTE_TOLERANCE_KEY)?
            .unwrap_or(defaults.numeric_absolute_tolerance),
    };

    settings.validate("<environment>")?;
    Ok(settings)
}
