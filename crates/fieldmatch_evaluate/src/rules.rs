//! Per-type comparison rules.
//!
//! Every rule is a pure function of the declared field and the two values. The
//! null rule runs first and overrides the type-specific comparators: a value
//! produced where the ground truth is null is always an error.

use fieldmatch_types::{
    ComparisonSettings, FieldSpec, FieldType, FieldValue, FieldVerdict, ValueKind, Verdict,
};
use std::collections::BTreeSet;

type RuleOutcome = (Verdict, Option<String>);

/// Compares one field and returns its verdict
pub fn compare_field(spec: &FieldSpec, expected: &FieldValue, actual: &FieldValue) -> FieldVerdict {
    let (verdict, note) = match (expected.is_null(), actual.is_null()) {
        (true, true) => (Verdict::MissingExpectedNull, None),
        (true, false) => (
            Verdict::UnexpectedValue,
            Some("value produced where ground truth is null".to_string()),
        ),
        (false, true) => (Verdict::Mismatch, Some("value missing from output".to_string())),
        (false, false) => match spec.field_type {
            FieldType::String => compare_string(expected, actual, &spec.settings),
            FieldType::List => compare_list(expected, actual, &spec.settings),
            FieldType::Number => compare_number(expected, actual, &spec.settings),
        },
    };

    let field_verdict = FieldVerdict::new(
        spec.name.clone(),
        spec.field_type,
        verdict,
        expected.clone(),
        actual.clone(),
    );

    match note {
        Some(note) => field_verdict.with_note(note),
        None => field_verdict,
    }
}

/// Trim and case-fold
pub fn normalize_text(value: &str) -> String {
    value.trim().to_lowercase()
}

fn type_mismatch(declared: FieldType, expected: &FieldValue, actual: &FieldValue) -> RuleOutcome {
    let offending = if expected_kind_ok(declared, expected.kind()) {
        format!("actual is {}", actual.kind())
    } else {
        format!("expected is {}", expected.kind())
    };

    (
        Verdict::Mismatch,
        Some(format!("declared {declared}, {offending}")),
    )
}

fn expected_kind_ok(declared: FieldType, kind: ValueKind) -> bool {
    matches!(
        (declared, kind),
        (FieldType::String, ValueKind::String)
            | (FieldType::List, ValueKind::List)
            | (FieldType::Number, ValueKind::Number)
    )
}

fn compare_string(
    expected: &FieldValue,
    actual: &FieldValue,
    settings: &ComparisonSettings,
) -> RuleOutcome {
    let (Some(expected_str), Some(actual_str)) = (expected.as_str(), actual.as_str()) else {
        return type_mismatch(FieldType::String, expected, actual);
    };

    let expected_norm = normalize_text(expected_str);
    let actual_norm = normalize_text(actual_str);

    if expected_norm == actual_norm {
        return (Verdict::Match, None);
    }

    let expected_len = expected_norm.chars().count();
    let actual_len = actual_norm.chars().count();

    let (shorter, shorter_len, longer, longer_len) = if expected_len <= actual_len {
        (&expected_norm, expected_len, &actual_norm, actual_len)
    } else {
        (&actual_norm, actual_len, &expected_norm, expected_len)
    };

    if !longer.contains(shorter.as_str()) {
        return (Verdict::Mismatch, None);
    }

    let overlap = shorter_len as f64 / longer_len as f64;
    if overlap >= settings.string_overlap {
        (
            Verdict::Match,
            Some(format!("substring match, overlap {overlap:.2}")),
        )
    } else {
        (
            Verdict::Mismatch,
            Some(format!(
                "substring overlap {overlap:.2} below {:.2}",
                settings.string_overlap
            )),
        )
    }
}

/// Normalized set key for a list element. Strings fold case and whitespace.
/// Integral numbers key by their exact integer value, so `5` and `5.0`
/// collapse while distinct large integers stay apart. Nested lists, malformed
/// and non-finite elements have no key.
fn list_key(item: &FieldValue) -> Option<String> {
    // 2^63, the first float past i64::MAX
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

    match item {
        FieldValue::Null => Some("null".to_string()),
        FieldValue::Boolean(b) => Some(format!("bool:{b}")),
        FieldValue::Integer(i) => Some(format!("int:{i}")),
        FieldValue::Float(f) if !f.is_finite() => None,
        FieldValue::Float(f) if f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(f) => {
            // -0.0 lands on 0 here
            Some(format!("int:{}", *f as i64))
        }
        FieldValue::Float(f) => Some(format!("num:{f}")),
        FieldValue::String(s) => Some(format!("str:{}", normalize_text(s))),
        FieldValue::List(_) | FieldValue::Malformed(_) => None,
    }
}

fn list_keys(items: &[FieldValue]) -> Option<BTreeSet<String>> {
    items.iter().map(list_key).collect()
}

fn compare_list(
    expected: &FieldValue,
    actual: &FieldValue,
    settings: &ComparisonSettings,
) -> RuleOutcome {
    let (Some(expected_items), Some(actual_items)) = (expected.as_list(), actual.as_list()) else {
        return type_mismatch(FieldType::List, expected, actual);
    };

    let Some(expected_set) = list_keys(expected_items) else {
        return (
            Verdict::Mismatch,
            Some("expected list contains a nested, malformed or non-finite element".to_string()),
        );
    };

    let Some(actual_set) = list_keys(actual_items) else {
        return (
            Verdict::Mismatch,
            Some("actual list contains a nested, malformed or non-finite element".to_string()),
        );
    };

    if expected_set == actual_set {
        return (Verdict::Match, None);
    }

    if expected_set.is_empty() {
        return (
            Verdict::Mismatch,
            Some(format!("{} item(s) where none expected", actual_set.len())),
        );
    }

    let covered = expected_set.intersection(&actual_set).count();
    let extra = actual_set.difference(&expected_set).count();
    let coverage = covered as f64 / expected_set.len() as f64;

    let note = format!(
        "covered {covered} of {} expected item(s), {extra} extra",
        expected_set.len()
    );

    if coverage >= settings.list_min_coverage && extra <= settings.list_max_extra {
        (Verdict::PartialMatch, Some(note))
    } else {
        (Verdict::Mismatch, Some(note))
    }
}

fn compare_number(
    expected: &FieldValue,
    actual: &FieldValue,
    settings: &ComparisonSettings,
) -> RuleOutcome {
    let (Some(expected_num), Some(actual_num)) = (expected.as_f64(), actual.as_f64()) else {
        return type_mismatch(FieldType::Number, expected, actual);
    };

    if !expected_num.is_finite() || !actual_num.is_finite() {
        return (Verdict::Mismatch, Some("non-finite number".to_string()));
    }

    // two integers compare exactly; widening to f64 first would merge
    // neighbours above 2^53
    let diff = match (expected, actual) {
        (FieldValue::Integer(e), FieldValue::Integer(a)) => {
            if e == a {
                return (Verdict::Match, None);
            }
            (i128::from(*a) - i128::from(*e)).unsigned_abs() as f64
        }
        _ => {
            if expected_num == actual_num {
                return (Verdict::Match, None);
            }
            (actual_num - expected_num).abs()
        }
    };

    let window = settings.numeric_window(expected_num);
    let note = format!("off by {diff}, tolerance {window}");

    if diff <= window {
        (Verdict::PartialMatch, Some(note))
    } else {
        (Verdict::Mismatch, Some(note))
    }
}
