use clap::{Args, Parser, Subcommand, ValueEnum};
use fieldmatch_types::RuleOverrides;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fieldmatch")]
#[command(version, about = "Field-level evaluation of extracted records against ground truth", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Evaluate model output against ground truth records")]
    Evaluate(EvaluateArgs),

    #[command(about = "Compare two saved evaluation reports and flag regressions")]
    Compare(CompareArgs),

    #[command(about = "Derive a schema from '[type: name]' hints in questions")]
    Schema(SchemaArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Table,
    Csv,
    Json,
    Yaml,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long, help = "Schema file (YAML or JSON)")]
    pub schema: PathBuf,

    #[arg(
        long,
        help = "Schema declared by the model output; must agree with --schema on field kinds"
    )]
    pub output_schema: Option<PathBuf>,

    #[arg(long, help = "Ground truth records")]
    pub expected: PathBuf,

    #[arg(long, help = "Model output records")]
    pub actual: PathBuf,

    #[arg(long, default_value = "id", help = "Key holding the record id")]
    pub id_key: String,

    #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
    pub format: ReportFormat,

    #[arg(long, help = "Write the rendered report here instead of stdout")]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Exit with status 2 when full-record accuracy falls below this fraction"
    )]
    pub fail_under: Option<f64>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

/// Command line threshold overrides. They sit above the environment and
/// below the schema file's own defaults and field overrides.
#[derive(Args, Debug, Default, Clone)]
pub struct ThresholdArgs {
    #[arg(long)]
    pub string_overlap: Option<f64>,

    #[arg(long)]
    pub list_min_coverage: Option<f64>,

    #[arg(long)]
    pub list_max_extra: Option<usize>,

    #[arg(long)]
    pub numeric_relative_tolerance: Option<f64>,

    #[arg(long)]
    pub numeric_absolute_tolerance: Option<f64>,
}

impl ThresholdArgs {
    pub fn overrides(&self) -> RuleOverrides {
        RuleOverrides {
            string_overlap: self.string_overlap,
            list_min_coverage: self.list_min_coverage,
            list_max_extra: self.list_max_extra,
            numeric_relative_tolerance: self.numeric_relative_tolerance,
            numeric_absolute_tolerance: self.numeric_absolute_tolerance,
        }
    }
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    #[arg(long, help = "Report of the reference run (JSON or YAML)")]
    pub baseline: PathBuf,

    #[arg(long, help = "Report of the run under test (JSON or YAML)")]
    pub candidate: PathBuf,

    #[arg(
        long,
        default_value_t = 0.0,
        help = "Largest accuracy drop tolerated before a field counts as regressed"
    )]
    pub threshold: f64,

    #[arg(long, help = "Print the comparison as JSON instead of tables")]
    pub json: bool,

    #[arg(long, help = "Also save the comparison as JSON at this path")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    #[arg(
        long = "hint",
        required_unless_present = "questions",
        help = "Question text carrying one or more '[type: name]' hints"
    )]
    pub hints: Vec<String>,

    #[arg(long, help = "File with one question per line")]
    pub questions: Option<PathBuf>,

    #[arg(long, help = "Save the schema as YAML at this path")]
    pub output: Option<PathBuf>,
}
