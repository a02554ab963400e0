use crate::error::EvaluationError;
use crate::report::EvaluationReport;
use crate::rules::compare_field;
use fieldmatch_types::{
    ComparisonSettings, FieldSchema, FieldValue, Record, RecordVerdict, SchemaDefinition,
};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};

/// An expected/actual record pair sharing one record id
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPair {
    pub id: String,
    pub expected: Record,
    pub actual: Record,
}

impl RecordPair {
    pub fn new(id: impl Into<String>, expected: Record, actual: Record) -> Self {
        Self {
            id: id.into(),
            expected,
            actual,
        }
    }
}

/// Aligns expected and actual records by id, in expected input order.
///
/// An expected record without output is paired with an empty record so every
/// field reads as null. Output without ground truth cannot be scored and is
/// dropped.
/// # Errors
/// Returns `EvaluationError::DuplicateRecordId` if an id repeats within either side
pub fn pair_records(
    expected: Vec<(String, Record)>,
    actual: Vec<(String, Record)>,
) -> Result<Vec<RecordPair>, EvaluationError> {
    let mut seen = HashSet::new();
    for (id, _) in &expected {
        if !seen.insert(id.as_str()) {
            return Err(EvaluationError::DuplicateRecordId {
                id: id.clone(),
                side: "expected",
            });
        }
    }

    let mut actual_map: HashMap<String, Record> = HashMap::with_capacity(actual.len());
    let mut actual_order = Vec::with_capacity(actual.len());
    for (id, record) in actual {
        if actual_map.contains_key(&id) {
            return Err(EvaluationError::DuplicateRecordId { id, side: "actual" });
        }
        actual_order.push(id.clone());
        actual_map.insert(id, record);
    }

    let pairs: Vec<RecordPair> = expected
        .into_iter()
        .map(|(id, expected_record)| {
            let actual_record = actual_map.remove(&id).unwrap_or_else(|| {
                warn!(record_id = %id, "No output record for ground truth; treating all fields as null");
                Record::empty()
            });
            RecordPair::new(id, expected_record, actual_record)
        })
        .collect();

    for id in actual_order {
        if actual_map.contains_key(&id) {
            warn!(record_id = %id, "Output record has no ground truth; skipping");
        }
    }

    Ok(pairs)
}

/// Applies the comparison rules of a schema to record pairs.
///
/// The evaluator holds nothing but the validated schema, so one instance can be
/// shared freely across threads.
#[derive(Debug, Clone)]
pub struct RecordEvaluator {
    schema: FieldSchema,
}

impl RecordEvaluator {
    pub fn new(schema: FieldSchema) -> Self {
        Self { schema }
    }

    /// Validates a schema definition and builds an evaluator from it.
    /// # Errors
    /// Any `SchemaError`, before a single record is looked at
    pub fn from_definition(
        definition: &SchemaDefinition,
        base: ComparisonSettings,
    ) -> Result<Self, EvaluationError> {
        let schema = FieldSchema::from_definition(definition, base)?;
        Ok(Self::new(schema))
    }

    /// Builds an evaluator when ground truth and model output each declare a
    /// schema. Both must agree on every field's kind.
    pub fn with_output_schema(
        schema: FieldSchema,
        output_schema: &FieldSchema,
    ) -> Result<Self, EvaluationError> {
        schema.reconcile(output_schema)?;
        Ok(Self::new(schema))
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Compares every schema field of one pair, in schema order
    pub fn evaluate(&self, record_id: &str, expected: &Record, actual: &Record) -> RecordVerdict {
        let fields = self
            .schema
            .fields()
            .iter()
            .map(|spec| {
                let expected_value = lookup(record_id, &spec.name, "expected", expected);
                let actual_value = lookup(record_id, &spec.name, "actual", actual);

                if expected_value.is_null() && !spec.nullable {
                    warn!(
                        record_id,
                        field = %spec.name,
                        "Ground truth is null for a field not declared nullable"
                    );
                }

                compare_field(spec, expected_value, actual_value)
            })
            .collect();

        RecordVerdict::new(record_id, fields)
    }

    pub fn evaluate_pair(&self, pair: &RecordPair) -> RecordVerdict {
        self.evaluate(&pair.id, &pair.expected, &pair.actual)
    }

    /// Evaluates all pairs sequentially and folds them into a report
    #[instrument(skip_all, fields(records = pairs.len()))]
    pub fn evaluate_all(&self, pairs: &[RecordPair]) -> EvaluationReport {
        let records = pairs.iter().map(|pair| self.evaluate_pair(pair)).collect();
        self.build_report(records)
    }

    /// Evaluates pairs on the rayon pool once there are at least
    /// `min_parallel_records` of them. Report order always follows `pairs`.
    #[instrument(skip_all, fields(records = pairs.len()))]
    pub fn evaluate_all_parallel(
        &self,
        pairs: &[RecordPair],
        min_parallel_records: usize,
    ) -> EvaluationReport {
        if pairs.len() < min_parallel_records.max(1) {
            return self.evaluate_all(pairs);
        }

        debug!("Evaluating {} records in parallel", pairs.len());

        // indexed collect keeps input order
        let records: Vec<RecordVerdict> = pairs
            .par_iter()
            .map(|pair| self.evaluate_pair(pair))
            .collect();

        self.build_report(records)
    }

    fn build_report(&self, records: Vec<RecordVerdict>) -> EvaluationReport {
        let report = EvaluationReport::new(self.schema.field_names(), records);
        debug!(
            "Evaluated {} records, {} fully correct",
            report.len(),
            report.fully_correct_count()
        );
        report
    }
}

static NULL: FieldValue = FieldValue::Null;

fn lookup<'a>(record_id: &str, field: &str, side: &str, record: &'a Record) -> &'a FieldValue {
    match record.get(field) {
        Some(value) => value,
        None => {
            warn!(record_id, field, side, "Field missing from record; treating as null");
            &NULL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmatch_types::{FieldDefinition, SchemaError, Verdict};

    fn resume_schema(string_overlap: f64) -> FieldSchema {
        let definition = SchemaDefinition::new(vec![
            FieldDefinition::new("name", "string"),
            FieldDefinition::new("skills", "list"),
            FieldDefinition::new("years", "number"),
            FieldDefinition::new("salary", "number?"),
        ]);
        FieldSchema::from_definition(
            &definition,
            ComparisonSettings {
                string_overlap,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn jane_expected() -> Record {
        [
            ("name", FieldValue::from("Jane")),
            ("skills", vec!["Python", "AWS"].into()),
            ("years", FieldValue::Integer(5)),
            ("salary", FieldValue::Null),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_scenario_a_depends_on_threshold() {
        let actual: Record = [
            ("name", FieldValue::from("Jane Doe")),
            ("skills", vec!["AWS", "Python"].into()),
            ("years", FieldValue::Integer(5)),
            ("salary", FieldValue::Null),
        ]
        .into_iter()
        .collect();

        let lenient = RecordEvaluator::new(resume_schema(0.5));
        let verdict = lenient.evaluate("a", &jane_expected(), &actual);
        assert_eq!(
            verdict.verdicts(),
            vec![
                Verdict::Match,
                Verdict::Match,
                Verdict::Match,
                Verdict::MissingExpectedNull
            ]
        );
        assert!(verdict.fully_correct);

        let strict = RecordEvaluator::new(resume_schema(0.6));
        let verdict = strict.evaluate("a", &jane_expected(), &actual);
        assert_eq!(verdict.field("name").unwrap().verdict, Verdict::Mismatch);
        assert!(!verdict.fully_correct);
    }

    #[test]
    fn test_scenario_b_unexpected_salary() {
        let evaluator = RecordEvaluator::new(resume_schema(0.6));
        let actual: Record = [
            ("name", FieldValue::from("Jane")),
            ("skills", vec!["Python", "AWS"].into()),
            ("years", FieldValue::Integer(5)),
            ("salary", FieldValue::Integer(120000)),
        ]
        .into_iter()
        .collect();

        let verdict = evaluator.evaluate("b", &jane_expected(), &actual);
        assert_eq!(
            verdict.field("salary").unwrap().verdict,
            Verdict::UnexpectedValue
        );
        assert!(!verdict.fully_correct);
    }

    #[test]
    fn test_scenario_c_years_within_tolerance() {
        let evaluator = RecordEvaluator::new(resume_schema(0.6));
        let actual: Record = [
            ("name", FieldValue::from("Jane")),
            ("skills", vec!["Python", "AWS"].into()),
            ("years", FieldValue::Integer(6)),
            ("salary", FieldValue::Null),
        ]
        .into_iter()
        .collect();

        let verdict = evaluator.evaluate("c", &jane_expected(), &actual);
        assert_eq!(verdict.field("years").unwrap().verdict, Verdict::PartialMatch);
        assert!(!verdict.fully_correct);
    }

    #[test]
    fn test_absent_keys_read_as_null() {
        let evaluator = RecordEvaluator::new(resume_schema(0.6));
        let expected: Record = [
            ("name", FieldValue::from("Jane")),
            ("skills", vec!["Python"].into()),
            ("years", FieldValue::Integer(5)),
        ]
        .into_iter()
        .collect();
        let actual = expected.clone();

        let verdict = evaluator.evaluate("absent", &expected, &actual);
        assert_eq!(
            verdict.field("salary").unwrap().verdict,
            Verdict::MissingExpectedNull
        );
        assert!(verdict.fully_correct);
    }

    #[test]
    fn test_verdicts_follow_schema_order() {
        let evaluator = RecordEvaluator::new(resume_schema(0.6));
        let verdict = evaluator.evaluate("order", &jane_expected(), &Record::empty());

        let fields: Vec<&str> = verdict.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "skills", "years", "salary"]);
    }

    #[test]
    fn test_unsupported_type_fails_before_evaluation() {
        let definition = SchemaDefinition::new(vec![
            FieldDefinition::new("name", "string"),
            FieldDefinition::new("profile", "object"),
        ]);

        let err = RecordEvaluator::from_definition(&definition, ComparisonSettings::default())
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::SchemaError(SchemaError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_output_schema_must_agree() {
        let definition = SchemaDefinition::new(vec![
            FieldDefinition::new("name", "string"),
            FieldDefinition::new("years", "list"),
        ]);
        let output =
            FieldSchema::from_definition(&definition, ComparisonSettings::default()).unwrap();

        let err = RecordEvaluator::with_output_schema(resume_schema(0.6), &output).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::SchemaError(SchemaError::SchemaDisagreement { .. })
        ));
    }

    #[test]
    fn test_pair_records() {
        let expected = vec![
            ("r2".to_string(), jane_expected()),
            ("r1".to_string(), jane_expected()),
        ];
        let actual = vec![
            ("r1".to_string(), jane_expected()),
            ("orphan".to_string(), jane_expected()),
        ];

        let pairs = pair_records(expected, actual).unwrap();
        let ids: Vec<&str> = pairs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r1"]);
        assert!(pairs[0].actual.is_empty());
        assert_eq!(pairs[1].actual, jane_expected());
    }

    #[test]
    fn test_pair_records_rejects_duplicates() {
        let expected = vec![
            ("r1".to_string(), Record::empty()),
            ("r1".to_string(), Record::empty()),
        ];
        let err = pair_records(expected, vec![]).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::DuplicateRecordId { side: "expected", .. }
        ));

        let actual = vec![
            ("r1".to_string(), Record::empty()),
            ("r1".to_string(), Record::empty()),
        ];
        let err = pair_records(vec![], actual).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::DuplicateRecordId { side: "actual", .. }
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let evaluator = RecordEvaluator::new(resume_schema(0.6));
        let pairs: Vec<RecordPair> = (0..64)
            .map(|i| {
                let actual: Record = [
                    ("name", FieldValue::from("Jane")),
                    ("skills", vec!["Python", "AWS"].into()),
                    ("years", FieldValue::Integer(5 + (i % 3))),
                    ("salary", FieldValue::Null),
                ]
                .into_iter()
                .collect();
                RecordPair::new(format!("r{i}"), jane_expected(), actual)
            })
            .collect();

        let sequential = evaluator.evaluate_all(&pairs);
        let parallel = evaluator.evaluate_all_parallel(&pairs, 8);

        assert_eq!(sequential.records(), parallel.records());
        assert_eq!(
            serde_json::to_string(&sequential).unwrap(),
            serde_json::to_string(&parallel).unwrap()
        );
    }
}
