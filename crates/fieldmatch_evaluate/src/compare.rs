use crate::error::EvaluationError;
use crate::render::format_accuracy;
use crate::report::EvaluationReport;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tabled::Tabled;
use tabled::{settings::Style, Table};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAccuracyChange {
    pub field: String,
    pub baseline_accuracy: Option<f64>,
    pub candidate_accuracy: Option<f64>,

    /// candidate - baseline; undefined if either side is
    pub delta: Option<f64>,
    pub is_regression: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordStatusChange {
    pub record_id: String,
    pub baseline_correct: bool,
    pub candidate_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentIn {
    BaselineOnly,
    CandidateOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingEntry {
    pub name: String,
    pub present_in: PresentIn,
}

#[derive(Tabled)]
struct FieldChangeEntry {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Baseline")]
    baseline: String,
    #[tabled(rename = "Candidate")]
    candidate: String,
    #[tabled(rename = "Delta")]
    delta: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct StatusChangeEntry {
    #[tabled(rename = "Record")]
    record_id: String,
    #[tabled(rename = "Baseline")]
    baseline_status: String,
    #[tabled(rename = "Candidate")]
    candidate_status: String,
    #[tabled(rename = "Change")]
    change: String,
}

/// Differences between a baseline evaluation run and a candidate run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportComparison {
    pub field_changes: Vec<FieldAccuracyChange>,
    pub baseline_record_accuracy: Option<f64>,
    pub candidate_record_accuracy: Option<f64>,
    pub record_accuracy_delta: Option<f64>,
    pub record_accuracy_regressed: bool,
    pub status_changes: Vec<RecordStatusChange>,
    pub missing_records: Vec<MissingEntry>,
    pub missing_fields: Vec<MissingEntry>,
    pub regression_threshold: f64,
    pub regressed: bool,
}

fn delta(baseline: Option<f64>, candidate: Option<f64>) -> Option<f64> {
    match (baseline, candidate) {
        (Some(b), Some(c)) => Some(c - b),
        _ => None,
    }
}

fn is_regression(delta: Option<f64>, threshold: f64) -> bool {
    delta.is_some_and(|d| d < -threshold)
}

fn status_label(correct: bool) -> &'static str {
    if correct {
        "Correct"
    } else {
        "Incorrect"
    }
}

fn format_delta(delta: Option<f64>) -> String {
    match delta {
        Some(d) => format!("{:+.2}%", d * 100.0),
        None => "n/a".to_string(),
    }
}

/// Compares a candidate evaluation run against a baseline.
///
/// # Arguments
///
/// * `baseline` - The report to compare against
/// * `candidate` - The report being compared
/// * `regression_threshold` - Accuracy drop beyond which a field is flagged
///
/// # Algorithm
///
/// 1. Per-field accuracy is taken from each full report and compared for
///    fields both runs declare; fields in only one run are listed as missing
/// 2. Records present in both runs are matched by id and their
///    `fully_correct` status compared; unmatched records are listed as missing
/// 3. The run regresses if any field, or full-record accuracy, drops by more
///    than `regression_threshold`. Undefined accuracies never regress.
///
/// # Errors
///
/// Returns `EvaluationError::InvalidRegressionThreshold` for a negative or
/// non-finite threshold
pub fn compare_reports(
    baseline: &EvaluationReport,
    candidate: &EvaluationReport,
    regression_threshold: f64,
) -> Result<ReportComparison, EvaluationError> {
    if !regression_threshold.is_finite() || regression_threshold < 0.0 {
        return Err(EvaluationError::InvalidRegressionThreshold(
            regression_threshold,
        ));
    }

    let mut field_changes = Vec::new();
    let mut missing_fields = Vec::new();

    for field in baseline.fields() {
        if candidate.fields().contains(field) {
            let baseline_accuracy = baseline.field_accuracy(field);
            let candidate_accuracy = candidate.field_accuracy(field);
            let field_delta = delta(baseline_accuracy, candidate_accuracy);

            field_changes.push(FieldAccuracyChange {
                field: field.clone(),
                baseline_accuracy,
                candidate_accuracy,
                delta: field_delta,
                is_regression: is_regression(field_delta, regression_threshold),
            });
        } else {
            missing_fields.push(MissingEntry {
                name: field.clone(),
                present_in: PresentIn::BaselineOnly,
            });
        }
    }

    for field in candidate.fields() {
        if !baseline.fields().contains(field) {
            missing_fields.push(MissingEntry {
                name: field.clone(),
                present_in: PresentIn::CandidateOnly,
            });
        }
    }

    let candidate_map: HashMap<&str, bool> = candidate
        .records()
        .iter()
        .map(|r| (r.record_id.as_str(), r.fully_correct))
        .collect();

    let baseline_map: HashMap<&str, bool> = baseline
        .records()
        .iter()
        .map(|r| (r.record_id.as_str(), r.fully_correct))
        .collect();

    let mut status_changes = Vec::new();
    let mut missing_records = Vec::new();

    for record in baseline.records() {
        match candidate_map.get(record.record_id.as_str()) {
            Some(&candidate_correct) if candidate_correct != record.fully_correct => {
                status_changes.push(RecordStatusChange {
                    record_id: record.record_id.clone(),
                    baseline_correct: record.fully_correct,
                    candidate_correct,
                });
            }
            Some(_) => {}
            None => missing_records.push(MissingEntry {
                name: record.record_id.clone(),
                present_in: PresentIn::BaselineOnly,
            }),
        }
    }

    for record in candidate.records() {
        if !baseline_map.contains_key(record.record_id.as_str()) {
            missing_records.push(MissingEntry {
                name: record.record_id.clone(),
                present_in: PresentIn::CandidateOnly,
            });
        }
    }

    let baseline_record_accuracy = baseline.record_accuracy();
    let candidate_record_accuracy = candidate.record_accuracy();
    let record_accuracy_delta = delta(baseline_record_accuracy, candidate_record_accuracy);
    let record_accuracy_regressed = is_regression(record_accuracy_delta, regression_threshold);

    let regressed =
        record_accuracy_regressed || field_changes.iter().any(|change| change.is_regression);

    Ok(ReportComparison {
        field_changes,
        baseline_record_accuracy,
        candidate_record_accuracy,
        record_accuracy_delta,
        record_accuracy_regressed,
        status_changes,
        missing_records,
        missing_fields,
        regression_threshold,
        regressed,
    })
}

impl ReportComparison {
    pub fn has_missing(&self) -> bool {
        !self.missing_records.is_empty() || !self.missing_fields.is_empty()
    }

    pub fn build_summary_table(&self) -> Table {
        let entries: Vec<_> = self
            .field_changes
            .iter()
            .map(|change| FieldChangeEntry {
                field: change.field.clone(),
                baseline: format_accuracy(change.baseline_accuracy),
                candidate: format_accuracy(change.candidate_accuracy),
                delta: format_delta(change.delta),
                status: change_status(change.delta, change.is_regression).to_string(),
            })
            .chain(std::iter::once(FieldChangeEntry {
                field: "(full record)".to_string(),
                baseline: format_accuracy(self.baseline_record_accuracy),
                candidate: format_accuracy(self.candidate_record_accuracy),
                delta: format_delta(self.record_accuracy_delta),
                status: change_status(self.record_accuracy_delta, self.record_accuracy_regressed)
                    .to_string(),
            }))
            .collect();

        let mut table = Table::new(entries);
        table.with(Style::sharp());
        table
    }

    pub fn build_status_changes_table(&self) -> Table {
        let entries: Vec<_> = self
            .status_changes
            .iter()
            .map(|change| StatusChangeEntry {
                record_id: change.record_id.clone(),
                baseline_status: status_label(change.baseline_correct).to_string(),
                candidate_status: status_label(change.candidate_correct).to_string(),
                change: match (change.baseline_correct, change.candidate_correct) {
                    (true, false) => "Correct → Incorrect",
                    (false, true) => "Incorrect → Correct",
                    _ => "No Change",
                }
                .to_string(),
            })
            .collect();

        let mut table = Table::new(entries);
        table.with(Style::sharp());
        table
    }

    pub fn print_missing(&self) {
        if !self.has_missing() {
            return;
        }

        println!("\n{}", "⚠ Missing Entries".yellow().bold());
        for (label, entries) in [
            ("Records", &self.missing_records),
            ("Fields", &self.missing_fields),
        ] {
            for present_in in [PresentIn::BaselineOnly, PresentIn::CandidateOnly] {
                let names: Vec<_> = entries
                    .iter()
                    .filter(|e| e.present_in == present_in)
                    .collect();

                if names.is_empty() {
                    continue;
                }

                let side = match present_in {
                    PresentIn::BaselineOnly => "baseline only",
                    PresentIn::CandidateOnly => "candidate only",
                };

                println!("  {label} in {side} ({}):", names.len());
                for entry in names {
                    println!("    - {}", entry.name);
                }
            }
        }
    }

    pub fn as_table(&self) {
        println!("{}", self.build_summary_table());

        if !self.status_changes.is_empty() {
            println!("\n{}", "Record Status Changes".truecolor(245, 77, 85).bold());
            println!("{}", self.build_status_changes_table());
        }

        self.print_missing();

        if self.regressed {
            println!("\n{}", "✗ Regression detected".red().bold());
        } else {
            println!("\n{}", "✓ No regression".green().bold());
        }
    }
}

fn change_status(delta: Option<f64>, regressed: bool) -> &'static str {
    match delta {
        None => "Undefined",
        Some(_) if regressed => "Regressed",
        Some(d) if d > 0.0 => "Improved",
        Some(_) => "Unchanged",
    }
}
