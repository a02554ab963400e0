use crate::schema::FieldType;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use strum_macros::EnumIter;

/// Outcome of comparing one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum Verdict {
    Match,
    PartialMatch,
    Mismatch,
    /// Expected and actual are both null
    MissingExpectedNull,
    /// Expected is null but the model produced a value
    UnexpectedValue,
}

impl Verdict {
    /// Whether this verdict counts toward accuracy
    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Match | Verdict::MissingExpectedNull)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Match => "match",
            Verdict::PartialMatch => "partial",
            Verdict::Mismatch => "mismatch",
            Verdict::MissingExpectedNull => "null",
            Verdict::UnexpectedValue => "unexpected",
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldVerdict {
    pub field: String,
    pub field_type: FieldType,
    pub verdict: Verdict,
    pub expected: FieldValue,
    pub actual: FieldValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FieldVerdict {
    pub fn new(
        field: impl Into<String>,
        field_type: FieldType,
        verdict: Verdict,
        expected: FieldValue,
        actual: FieldValue,
    ) -> Self {
        Self {
            field: field.into(),
            field_type,
            verdict,
            expected,
            actual,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn is_correct(&self) -> bool {
        self.verdict.is_correct()
    }
}

/// Verdicts for one expected/actual pair, in schema order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordVerdict {
    pub record_id: String,
    pub fields: Vec<FieldVerdict>,
    pub fully_correct: bool,
}

impl RecordVerdict {
    pub fn new(record_id: impl Into<String>, fields: Vec<FieldVerdict>) -> Self {
        let fully_correct = fields.iter().all(FieldVerdict::is_correct);
        Self {
            record_id: record_id.into(),
            fields,
            fully_correct,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldVerdict> {
        self.fields.iter().find(|f| f.field == name)
    }

    pub fn verdicts(&self) -> Vec<Verdict> {
        self.fields.iter().map(|f| f.verdict).collect()
    }
}
