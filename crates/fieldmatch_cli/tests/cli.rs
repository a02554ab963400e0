use approx::assert_relative_eq;
use clap::Parser;
use fieldmatch_cli::{run, Cli, Outcome};
use fieldmatch_evaluate::{EvaluationError, EvaluationReport, ReportComparison};
use fieldmatch_settings::FieldmatchConfig;
use fieldmatch_types::{HelperFuncs, SchemaDefinition, Verdict};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SCHEMA: &str = "\
defaults:
  string_overlap: 0.5
fields:
  - name: name
    type: string
  - name: skills
    type: list
  - name: years
    type: number
  - name: salary
    type: number?
";

const STRICT_SCHEMA: &str = "\
fields:
  - name: name
    type: string
  - name: skills
    type: list
  - name: years
    type: number
  - name: salary
    type: optional<number>
";

const EXPECTED: &str = r#"[
  {"id": "a", "name": "Jane", "skills": ["Python", "AWS"], "years": 5, "salary": null},
  {"id": "b", "name": "Jane", "skills": ["Python", "AWS"], "years": 5, "salary": null},
  {"id": "c", "name": "Jane", "skills": ["Python", "AWS"], "years": 5, "salary": null}
]"#;

const ACTUAL: &str = r#"{"id": "a", "name": "Jane Doe", "skills": ["AWS", "Python"], "years": 5, "salary": null}
{"id": "b", "name": "Jane", "skills": ["Python", "AWS"], "years": 5, "salary": 120000}
{"id": "c", "name": "Jane", "skills": ["Python", "AWS"], "years": 6, "salary": null}
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let workspace = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        workspace.write("schema.yaml", SCHEMA);
        workspace.write("strict.yaml", STRICT_SCHEMA);
        workspace.write("expected.json", EXPECTED);
        workspace.write("actual.jsonl", ACTUAL);
        workspace
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn arg(&self, name: &str) -> String {
        self.path(name).display().to_string()
    }

    fn evaluate(&self, schema: &str, extra: &[&str]) -> Result<Outcome, anyhow::Error> {
        let mut args = vec![
            "fieldmatch".to_string(),
            "evaluate".to_string(),
            "--schema".to_string(),
            self.arg(schema),
            "--expected".to_string(),
            self.arg("expected.json"),
            "--actual".to_string(),
            self.arg("actual.jsonl"),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        execute(&args)
    }
}

fn execute(args: &[String]) -> Result<Outcome, anyhow::Error> {
    let cli = Cli::try_parse_from(args).unwrap();
    run(&cli, &FieldmatchConfig::default())
}

fn load_report(path: &Path) -> EvaluationReport {
    HelperFuncs::load_document(path).unwrap()
}

#[test]
fn test_evaluate_writes_json_report() {
    let ws = Workspace::new();
    let output = ws.arg("report.json");

    let outcome = ws
        .evaluate("schema.yaml", &["--format", "json", "--output", &output])
        .unwrap();
    assert_eq!(outcome, Outcome::Passed);

    let report = load_report(&ws.path("report.json"));
    assert_eq!(report.fields(), ["name", "skills", "years", "salary"]);

    let a = report.record("a").unwrap();
    assert!(a.fully_correct);
    assert_eq!(
        a.field("salary").unwrap().verdict,
        Verdict::MissingExpectedNull
    );

    let b = report.record("b").unwrap();
    assert_eq!(b.field("salary").unwrap().verdict, Verdict::UnexpectedValue);
    assert!(!b.fully_correct);

    let c = report.record("c").unwrap();
    assert_eq!(c.field("years").unwrap().verdict, Verdict::PartialMatch);

    assert_relative_eq!(report.record_accuracy().unwrap(), 1.0 / 3.0);
    assert_relative_eq!(report.field_accuracy("years").unwrap(), 2.0 / 3.0);
    assert_relative_eq!(report.field_accuracy("name").unwrap(), 1.0);
}

#[test]
fn test_evaluate_writes_csv_report() {
    let ws = Workspace::new();
    let output = ws.arg("report.csv");

    ws.evaluate("schema.yaml", &["--format", "csv", "--output", &output])
        .unwrap();

    let csv = std::fs::read_to_string(ws.path("report.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Record,name,skills,years,salary,Fully Correct");
    assert_eq!(lines[1], "a,match,match,match,null,true");
    assert_eq!(lines[3], "c,match,match,partial,null,false");
    assert_eq!(lines[4], "Accuracy,100.00%,100.00%,66.67%,66.67%,33.33%");
}

#[test]
fn test_command_line_threshold_applies_without_schema_defaults() {
    let ws = Workspace::new();
    let output = ws.arg("strict.json");

    ws.evaluate(
        "strict.yaml",
        &["--string-overlap", "0.6", "--format", "json", "--output", &output],
    )
    .unwrap();

    let report = load_report(&ws.path("strict.json"));
    // "jane" covers half of "jane doe"
    assert_eq!(
        report.record("a").unwrap().field("name").unwrap().verdict,
        Verdict::Mismatch
    );
    assert_eq!(report.record_accuracy(), Some(0.0));
}

#[test]
fn test_fail_under_gate() {
    let ws = Workspace::new();
    let output = ws.arg("gate.json");

    let missed = ws
        .evaluate(
            "schema.yaml",
            &["--format", "json", "--output", &output, "--fail-under", "0.5"],
        )
        .unwrap();
    assert_eq!(missed, Outcome::Failed);

    let held = ws
        .evaluate(
            "schema.yaml",
            &["--format", "json", "--output", &output, "--fail-under", "0.3"],
        )
        .unwrap();
    assert_eq!(held, Outcome::Passed);

    assert!(ws
        .evaluate("schema.yaml", &["--fail-under", "1.5"])
        .is_err());
}

#[test]
fn test_unsupported_type_fails_before_evaluation() {
    let ws = Workspace::new();
    ws.write(
        "bad.yaml",
        "fields:\n  - name: name\n    type: string\n  - name: active\n    type: boolean\n",
    );
    let output = ws.arg("never.json");

    let err = ws
        .evaluate("bad.yaml", &["--format", "json", "--output", &output])
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("boolean"));
    assert!(message.contains("string, list, number"));
    assert!(!ws.path("never.json").exists());
}

#[test]
fn test_duplicate_record_ids_fail() {
    let ws = Workspace::new();
    ws.write(
        "expected.json",
        r#"[{"id": "a", "name": "Jane"}, {"id": "a", "name": "Bob"}]"#,
    );

    let err = ws.evaluate("schema.yaml", &["--format", "json"]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EvaluationError>(),
        Some(EvaluationError::DuplicateRecordId { .. })
    ));
}

#[test]
fn test_compare_flags_regression() {
    let ws = Workspace::new();
    let baseline = ws.arg("baseline.json");
    let candidate = ws.arg("candidate.json");

    ws.evaluate("schema.yaml", &["--format", "json", "--output", &baseline])
        .unwrap();
    ws.evaluate(
        "strict.yaml",
        &["--string-overlap", "0.6", "--format", "json", "--output", &candidate],
    )
    .unwrap();

    let comparison_path = ws.arg("comparison.json");
    let regressed = execute(&[
        "fieldmatch".to_string(),
        "compare".to_string(),
        "--baseline".to_string(),
        baseline.clone(),
        "--candidate".to_string(),
        candidate.clone(),
        "--output".to_string(),
        comparison_path,
    ])
    .unwrap();
    assert_eq!(regressed, Outcome::Failed);

    let comparison: ReportComparison =
        HelperFuncs::load_document(&ws.path("comparison.json")).unwrap();
    assert!(comparison.regressed);
    assert!(comparison.record_accuracy_regressed);

    // the reverse direction is an improvement
    let improved = execute(&[
        "fieldmatch".to_string(),
        "compare".to_string(),
        "--baseline".to_string(),
        candidate,
        "--candidate".to_string(),
        baseline,
        "--json".to_string(),
    ])
    .unwrap();
    assert_eq!(improved, Outcome::Passed);
}

#[test]
fn test_schema_from_hints() {
    let ws = Workspace::new();
    ws.write(
        "questions.txt",
        "Which categories sell best? [list: top_categories]\n\n",
    );

    let outcome = execute(&[
        "fieldmatch".to_string(),
        "schema".to_string(),
        "--hint".to_string(),
        "How many sellers list more than 5 products? [integer: seller_count]".to_string(),
        "--questions".to_string(),
        ws.arg("questions.txt"),
        "--output".to_string(),
        ws.arg("derived.yaml"),
    ])
    .unwrap();
    assert_eq!(outcome, Outcome::Passed);

    let definition: SchemaDefinition = HelperFuncs::load_document(&ws.path("derived.yaml")).unwrap();
    let names: Vec<&str> = definition.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["seller_count", "top_categories"]);
    assert_eq!(definition.fields[0].type_tag, "integer");
}

#[test]
fn test_schema_without_hint_fails() {
    let err = execute(&[
        "fieldmatch".to_string(),
        "schema".to_string(),
        "--hint".to_string(),
        "What is the average order value?".to_string(),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("No type hint"));
}
