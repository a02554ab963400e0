use crate::error::EvaluationError;
use crate::report::{EvaluationReport, FieldSummary};
use itertools::Itertools;
use owo_colors::OwoColorize;
use tabled::builder::Builder;
use tabled::{
    settings::{object::Rows, Alignment, Color, Format, Style},
    Table,
};

const RECORD_COLUMN: &str = "Record";
const FULLY_CORRECT_COLUMN: &str = "Fully Correct";
const ACCURACY_ROW: &str = "Accuracy";
const LENIENT_ROW: &str = "Lenient Accuracy";

/// Percentage with two decimals, or `n/a` when undefined
pub fn format_accuracy(accuracy: Option<f64>) -> String {
    match accuracy {
        Some(value) => format!("{:.2}%", value * 100.0),
        None => "n/a".to_string(),
    }
}

fn header(report: &EvaluationReport) -> Vec<String> {
    std::iter::once(RECORD_COLUMN.to_string())
        .chain(report.fields().iter().cloned())
        .chain(std::iter::once(FULLY_CORRECT_COLUMN.to_string()))
        .collect()
}

/// One row per record, one column per field, then the two footer rows
fn rows(report: &EvaluationReport) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = report
        .records()
        .iter()
        .map(|record| {
            std::iter::once(record.record_id.clone())
                .chain(report.fields().iter().map(|field| {
                    record
                        .field(field)
                        .map(|f| f.verdict.to_string())
                        .unwrap_or_default()
                }))
                .chain(std::iter::once(record.fully_correct.to_string()))
                .collect()
        })
        .collect();

    let summaries = report.field_summaries();
    rows.push(footer(
        ACCURACY_ROW,
        &summaries,
        |s| s.accuracy,
        format_accuracy(report.record_accuracy()),
    ));
    rows.push(footer(
        LENIENT_ROW,
        &summaries,
        |s| s.lenient_accuracy,
        String::new(),
    ));
    rows
}

fn footer(
    label: &str,
    summaries: &[FieldSummary],
    accuracy: impl Fn(&FieldSummary) -> Option<f64>,
    last: String,
) -> Vec<String> {
    std::iter::once(label.to_string())
        .chain(summaries.iter().map(|s| format_accuracy(accuracy(s))))
        .chain(std::iter::once(last))
        .collect()
}

impl EvaluationReport {
    /// The verdict table without color codes, for files and pipes
    pub fn build_plain_table(&self) -> Table {
        let mut builder = Builder::default();
        builder.push_record(header(self));
        for row in rows(self) {
            builder.push_record(row);
        }

        let mut table = builder.build();
        table.with(Style::sharp());
        table.modify(Rows::new(0..1), Alignment::center());
        table
    }

    /// Build the record/field verdict table for console display
    pub fn build_table(&self) -> Table {
        let mut table = self.build_plain_table();

        table.modify(
            Rows::new(0..1),
            (
                Format::content(|s: &str| s.truecolor(245, 77, 85).bold().to_string()),
                Color::BOLD,
            ),
        );
        table
    }

    pub fn as_table(&self) {
        println!("\n{}", "Field Verdicts".truecolor(245, 77, 85).bold());
        println!("{}", self.build_table());
    }

    /// Same layout as the table: header, one row per record, footer rows
    pub fn to_csv(&self) -> Result<String, EvaluationError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(header(self))?;
        for row in rows(self) {
            writer.write_record(row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| EvaluationError::CsvFlushError(e.to_string()))?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn to_json(&self) -> Result<String, EvaluationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> Result<String, EvaluationError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// One line per record: a check for fully correct records, otherwise the
    /// fields that missed
    pub fn outcome_lines(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|record| {
                if record.fully_correct {
                    format!("✓ Record '{}' fully correct", record.record_id)
                } else {
                    let missed = record
                        .fields
                        .iter()
                        .filter(|f| !f.is_correct())
                        .map(|f| format!("{} ({})", f.field, f.verdict))
                        .join(", ");
                    format!("✗ Record '{}' failed: {}", record.record_id, missed)
                }
            })
            .collect()
    }

    pub fn print_outcomes(&self) {
        for (record, line) in self.records().iter().zip(self.outcome_lines()) {
            if record.fully_correct {
                println!("{}", line.green());
            } else {
                println!("{}", line.red());
            }
        }
        println!(
            "{} {}",
            "Full-record accuracy:".bold(),
            format_accuracy(self.record_accuracy())
        );
    }
}
