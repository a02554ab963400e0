use crate::cli::{CompareArgs, EvaluateArgs, ReportFormat, SchemaArgs};
use crate::loader::load_records;
use anyhow::{anyhow, bail, Context};
use fieldmatch_evaluate::{
    compare_reports, format_accuracy, pair_records, EvaluationError, EvaluationReport,
    RecordEvaluator, ReportComparison,
};
use fieldmatch_settings::FieldmatchConfig;
use fieldmatch_types::{
    ComparisonSettings, FieldSchema, FieldType, FileName, HelperFuncs, SchemaDefinition,
    SchemaError,
};
use std::io::IsTerminal;
use std::path::Path;
use strum::IntoEnumIterator;
use tracing::{info, instrument, warn};

/// Whether a command's quality gate held. Errors are reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
}

fn supported_types() -> String {
    FieldType::iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Points at the accepted kinds when a schema declares an unknown one
fn explain_schema_error(err: SchemaError) -> anyhow::Error {
    match err {
        SchemaError::UnsupportedType { .. } => {
            anyhow!("{err} (supported types: {})", supported_types())
        }
        other => anyhow::Error::new(other),
    }
}

fn explain_evaluation_error(err: EvaluationError) -> anyhow::Error {
    match err {
        EvaluationError::SchemaError(schema_err) => explain_schema_error(schema_err),
        other => anyhow::Error::new(other),
    }
}

fn load_schema(path: &Path, base: ComparisonSettings) -> Result<FieldSchema, anyhow::Error> {
    let definition: SchemaDefinition = HelperFuncs::load_document(path)
        .with_context(|| format!("Failed to load schema from {}", path.display()))?;
    FieldSchema::from_definition(&definition, base).map_err(explain_schema_error)
}

/// Renders for a file, so the table carries no color codes
fn render(report: &EvaluationReport, format: ReportFormat) -> Result<String, EvaluationError> {
    match format {
        ReportFormat::Table => Ok(report.build_plain_table().to_string()),
        ReportFormat::Csv => report.to_csv(),
        ReportFormat::Json => report.to_json(),
        ReportFormat::Yaml => report.to_yaml(),
    }
}

#[instrument(skip_all)]
pub fn evaluate(args: &EvaluateArgs, config: &FieldmatchConfig) -> Result<Outcome, anyhow::Error> {
    if let Some(fail_under) = args.fail_under {
        if !(0.0..=1.0).contains(&fail_under) {
            bail!("--fail-under must lie between 0 and 1, got {fail_under}");
        }
    }

    let base = args.thresholds.overrides().apply(config.comparison);
    base.validate("<command line>").map_err(explain_schema_error)?;

    let schema = load_schema(&args.schema, base)?;
    let evaluator = match &args.output_schema {
        Some(path) => {
            let output_schema = load_schema(path, base)?;
            RecordEvaluator::with_output_schema(schema, &output_schema)
                .map_err(explain_evaluation_error)?
        }
        None => RecordEvaluator::new(schema),
    };

    let expected = load_records(&args.expected, &args.id_key)?;
    let actual = load_records(&args.actual, &args.id_key)?;
    let pairs = pair_records(expected, actual)?;

    let report = evaluator.evaluate_all_parallel(&pairs, config.parallel.min_records);

    match &args.output {
        Some(path) => {
            std::fs::write(path, render(&report, args.format)?)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Wrote {} report to {}", report.len(), path.display());
        }
        None if args.format == ReportFormat::Table => {
            report.as_table();
            report.print_outcomes();
        }
        None => println!("{}", render(&report, args.format)?),
    }

    let Some(fail_under) = args.fail_under else {
        return Ok(Outcome::Passed);
    };

    match report.record_accuracy() {
        Some(accuracy) if accuracy >= fail_under => Ok(Outcome::Passed),
        accuracy => {
            warn!(
                "Full-record accuracy {} is below the required {}",
                format_accuracy(accuracy),
                format_accuracy(Some(fail_under))
            );
            Ok(Outcome::Failed)
        }
    }
}

fn comparison_json(comparison: &ReportComparison, colored: bool) -> String {
    if colored {
        HelperFuncs::to_colored_json(comparison)
    } else {
        HelperFuncs::to_pretty_json(comparison)
    }
}

#[instrument(skip_all)]
pub fn compare(args: &CompareArgs) -> Result<Outcome, anyhow::Error> {
    let baseline: EvaluationReport = HelperFuncs::load_document(&args.baseline)
        .with_context(|| format!("Failed to load baseline {}", args.baseline.display()))?;
    let candidate: EvaluationReport = HelperFuncs::load_document(&args.candidate)
        .with_context(|| format!("Failed to load candidate {}", args.candidate.display()))?;

    let comparison = compare_reports(&baseline, &candidate, args.threshold)?;

    if args.json {
        println!(
            "{}",
            comparison_json(&comparison, std::io::stdout().is_terminal())
        );
    } else {
        comparison.as_table();
    }

    if let Some(path) = &args.output {
        let written = HelperFuncs::save_to_json(
            &comparison,
            Some(path.clone()),
            FileName::ReportComparison.to_str(),
        )?;
        info!("Saved comparison to {}", written.display());
    }

    if comparison.regressed {
        warn!("Candidate run regressed against the baseline");
        Ok(Outcome::Failed)
    } else {
        Ok(Outcome::Passed)
    }
}

#[instrument(skip_all)]
pub fn schema(args: &SchemaArgs) -> Result<Outcome, anyhow::Error> {
    let mut texts = args.hints.clone();
    if let Some(path) = &args.questions {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read questions from {}", path.display()))?;
        texts.extend(
            content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string),
        );
    }

    let definition = SchemaDefinition::from_type_hints(&texts).map_err(explain_schema_error)?;

    // reject hints naming kinds or duplicates the evaluator would refuse
    FieldSchema::from_definition(&definition, ComparisonSettings::default())
        .map_err(explain_schema_error)?;

    match &args.output {
        Some(path) => {
            let written =
                HelperFuncs::save_to_yaml(&definition, Some(path.clone()), FileName::Schema.to_str())?;
            info!("Saved schema to {}", written.display());
        }
        None => print!("{}", serde_yaml::to_string(&definition)?),
    }

    Ok(Outcome::Passed)
}
