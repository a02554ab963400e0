use fieldmatch_types::{RecordVerdict, Verdict};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

/// `numerator / denominator`, undefined for an empty denominator
pub fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Verdict counts and accuracy for one field across all records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub field: String,
    pub total: usize,
    pub matched: usize,
    pub partial: usize,
    pub mismatched: usize,
    pub missing_expected_null: usize,
    pub unexpected: usize,

    /// (matched + missing_expected_null) / total; `None` with no records
    pub accuracy: Option<f64>,

    /// Like `accuracy`, but partial matches also count
    pub lenient_accuracy: Option<f64>,
}

impl FieldSummary {
    fn from_records(field: &str, records: &[RecordVerdict]) -> Self {
        let mut summary = FieldSummary {
            field: field.to_string(),
            total: records.len(),
            matched: 0,
            partial: 0,
            mismatched: 0,
            missing_expected_null: 0,
            unexpected: 0,
            accuracy: None,
            lenient_accuracy: None,
        };

        for verdict in records
            .iter()
            .filter_map(|record| record.field(field).map(|f| f.verdict))
        {
            match verdict {
                Verdict::Match => summary.matched += 1,
                Verdict::PartialMatch => summary.partial += 1,
                Verdict::Mismatch => summary.mismatched += 1,
                Verdict::MissingExpectedNull => summary.missing_expected_null += 1,
                Verdict::UnexpectedValue => summary.unexpected += 1,
            }
        }

        let correct = summary.matched + summary.missing_expected_null;
        summary.accuracy = ratio(correct, summary.total);
        summary.lenient_accuracy = ratio(correct + summary.partial, summary.total);
        summary
    }
}

/// Aggregate statistics of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_records: usize,
    pub fully_correct_records: usize,

    /// fully_correct_records / total_records; `None` with no records
    pub record_accuracy: Option<f64>,

    pub fields: Vec<FieldSummary>,
}

/// Ordered record verdicts of one evaluation run.
///
/// Nothing but the verdicts is stored: every statistic is recomputed from
/// them on request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ReportDocument")]
pub struct EvaluationReport {
    fields: Vec<String>,
    records: Vec<RecordVerdict>,
}

#[derive(Deserialize)]
struct ReportDocument {
    fields: Vec<String>,
    records: Vec<RecordVerdict>,
}

impl From<ReportDocument> for EvaluationReport {
    fn from(document: ReportDocument) -> Self {
        // re-derive fully_correct rather than trusting the stored flag
        let records = document
            .records
            .into_iter()
            .map(|record| RecordVerdict::new(record.record_id, record.fields))
            .collect();
        Self::new(document.fields, records)
    }
}

impl EvaluationReport {
    pub fn new(fields: Vec<String>, records: Vec<RecordVerdict>) -> Self {
        Self { fields, records }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn records(&self) -> &[RecordVerdict] {
        &self.records
    }

    pub fn record(&self, record_id: &str) -> Option<&RecordVerdict> {
        self.records.iter().find(|r| r.record_id == record_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn fully_correct_count(&self) -> usize {
        self.records.iter().filter(|r| r.fully_correct).count()
    }

    /// Fraction of records where every field counts as correct
    pub fn record_accuracy(&self) -> Option<f64> {
        ratio(self.fully_correct_count(), self.records.len())
    }

    /// Fraction of records where `field` counts as correct. `None` for an
    /// unknown field or an empty report.
    pub fn field_accuracy(&self, field: &str) -> Option<f64> {
        if !self.fields.iter().any(|f| f == field) {
            return None;
        }
        FieldSummary::from_records(field, &self.records).accuracy
    }

    pub fn field_summary(&self, field: &str) -> Option<FieldSummary> {
        self.fields
            .iter()
            .find(|f| *f == field)
            .map(|f| FieldSummary::from_records(f, &self.records))
    }

    /// Per-field summaries in schema order
    pub fn field_summaries(&self) -> Vec<FieldSummary> {
        self.fields
            .iter()
            .map(|f| FieldSummary::from_records(f, &self.records))
            .collect()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total_records: self.records.len(),
            fully_correct_records: self.fully_correct_count(),
            record_accuracy: self.record_accuracy(),
            fields: self.field_summaries(),
        }
    }
}

impl Serialize for EvaluationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("EvaluationReport", 3)?;
        state.serialize_field("fields", &self.fields)?;
        state.serialize_field("records", &self.records)?;
        state.serialize_field("summary", &self.summary())?;
        state.end()
    }
}
