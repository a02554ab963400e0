use fieldmatch_types::Record;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Entry {index} in {path} is not an object")]
    NotAnObject { path: String, index: usize },

    #[error("Entry {index} in {path} has no string or numeric '{id_key}'")]
    MissingId {
        path: String,
        index: usize,
        id_key: String,
    },

    #[error(
        "{path} must hold an array of records, an object keyed by record id, or JSON Lines"
    )]
    UnsupportedLayout { path: String },
}

enum RecordFormat {
    Json,
    JsonLines,
    Yaml,
}

impl RecordFormat {
    fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("jsonl") | Some("ndjson") => RecordFormat::JsonLines,
            Some("yaml") | Some("yml") => RecordFormat::Yaml,
            _ => RecordFormat::Json,
        }
    }
}

/// Loads `(record id, record)` pairs in file order.
///
/// Accepted layouts:
/// - an array of objects, each carrying its id under `id_key`
/// - an object mapping record id to record (ids come out sorted)
/// - JSON Lines, one object per line, id under `id_key`
///
/// String and numeric ids are both accepted; `7` and `"7"` name the same record.
pub fn load_records(path: &Path, id_key: &str) -> Result<Vec<(String, Record)>, LoadError> {
    let path_label = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path_label.clone(),
        source,
    })?;

    let parse_error = |message: String| LoadError::ParseError {
        path: path_label.clone(),
        message,
    };

    let document = match RecordFormat::from_path(path) {
        RecordFormat::JsonLines => Value::Array(
            content
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(number, line)| {
                    serde_json::from_str(line)
                        .map_err(|e| parse_error(format!("line {}: {e}", number + 1)))
                })
                .collect::<Result<Vec<Value>, _>>()?,
        ),
        RecordFormat::Json => {
            serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?
        }
        RecordFormat::Yaml => {
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?
        }
    };

    let records = records_from_document(document, id_key, &path_label)?;
    debug!("Loaded {} records from {}", records.len(), path_label);
    Ok(records)
}

fn records_from_document(
    document: Value,
    id_key: &str,
    path: &str,
) -> Result<Vec<(String, Record)>, LoadError> {
    match document {
        Value::Array(entries) => entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let id = entry
                    .get(id_key)
                    .and_then(id_from_value)
                    .ok_or_else(|| {
                        if entry.is_object() {
                            LoadError::MissingId {
                                path: path.to_string(),
                                index,
                                id_key: id_key.to_string(),
                            }
                        } else {
                            LoadError::NotAnObject {
                                path: path.to_string(),
                                index,
                            }
                        }
                    })?;

                let record = Record::from_json(entry).ok_or_else(|| LoadError::NotAnObject {
                    path: path.to_string(),
                    index,
                })?;
                Ok((id, record))
            })
            .collect(),

        Value::Object(map) if map.values().all(Value::is_object) => {
            let mut records = map
                .into_iter()
                .enumerate()
                .map(|(index, (id, entry))| {
                    Record::from_json(entry)
                        .map(|record| (id, record))
                        .ok_or_else(|| LoadError::NotAnObject {
                            path: path.to_string(),
                            index,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            records.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(records)
        }

        _ => Err(LoadError::UnsupportedLayout {
            path: path.to_string(),
        }),
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmatch_types::FieldValue;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_array_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "records.json",
            r#"[{"id": "r1", "name": "Jane"}, {"id": 2, "name": "Bob"}]"#,
        );

        let records = load_records(&path, "id").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "r1");
        assert_eq!(records[1].0, "2");
        assert_eq!(records[1].1.get("name"), Some(&FieldValue::from("Bob")));
    }

    #[test]
    fn test_keyed_object_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "records.json",
            r#"{"r2": {"name": "Bob"}, "r1": {"name": "Jane"}}"#,
        );

        let records = load_records(&path, "id").unwrap();
        let ids: Vec<&str> = records.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }

    #[test]
    fn test_json_lines_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "records.jsonl",
            "{\"doc\": \"a\", \"years\": 5}\n\n{\"doc\": \"b\", \"years\": null}\n",
        );

        let records = load_records(&path, "doc").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].1.get("years"), Some(&FieldValue::Integer(5)));
        assert_eq!(records[1].1.get("years"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_yaml_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "records.yaml",
            "- id: r1\n  skills: [Python, AWS]\n",
        );

        let records = load_records(&path, "id").unwrap();
        assert_eq!(
            records[0].1.get("skills"),
            Some(&FieldValue::from(vec!["Python", "AWS"]))
        );
    }

    #[test]
    fn test_missing_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "records.json", r#"[{"name": "Jane"}]"#);

        let err = load_records(&path, "id").unwrap_err();
        assert!(matches!(err, LoadError::MissingId { index: 0, .. }));
    }

    #[test]
    fn test_scalar_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "records.json", "42");

        let err = load_records(&path, "id").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedLayout { .. }));
    }

    #[test]
    fn test_bad_json_line_names_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "records.jsonl", "{\"id\": \"a\"}\n{not json\n");

        let err = load_records(&path, "id").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
