pub mod compare;
pub mod error;
pub mod evaluator;
pub mod render;
pub mod report;
pub mod rules;

pub use compare::{compare_reports, ReportComparison};
pub use error::EvaluationError;
pub use evaluator::{pair_records, RecordEvaluator, RecordPair};
pub use render::format_accuracy;
pub use report::{EvaluationReport, FieldSummary, ReportSummary};
pub use rules::compare_field;
