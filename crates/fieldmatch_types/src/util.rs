use crate::error::UtilError;
use colored_json::{Color, ColorMode, ColoredFormatter, PrettyFormatter, Styler};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub fn fieldmatch_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub enum FileName {
    EvaluationReport,
    ReportComparison,
    Schema,
}

impl FileName {
    pub fn to_str(&self) -> &'static str {
        match self {
            FileName::EvaluationReport => "evaluation_report.json",
            FileName::ReportComparison => "report_comparison.json",
            FileName::Schema => "schema.yaml",
        }
    }
}

/// Serialization formats understood by the file helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, UtilError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "json" | "jsonl" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            _ => Err(UtilError::UnsupportedExtension(extension)),
        }
    }
}

pub struct HelperFuncs {}

impl HelperFuncs {
    /// Pretty JSON with the key and value colors used for console output
    pub fn to_colored_json<T: Serialize>(object: T) -> String {
        match ColoredFormatter::with_styler(
            PrettyFormatter::default(),
            Styler {
                key: Color::Rgb(245, 77, 85).bold(),
                string_value: Color::Rgb(249, 179, 93).foreground(),
                float_value: Color::Rgb(249, 179, 93).foreground(),
                integer_value: Color::Rgb(249, 179, 93).foreground(),
                bool_value: Color::Rgb(249, 179, 93).foreground(),
                nil_value: Color::Rgb(249, 179, 93).foreground(),
                ..Default::default()
            },
        )
        .to_colored_json(&object, ColorMode::On)
        {
            Ok(json) => json,
            Err(e) => format!("Failed to serialize to json: {e}"),
        }
    }

    pub fn to_pretty_json<T: Serialize>(object: T) -> String {
        match serde_json::to_string_pretty(&object) {
            Ok(json) => json,
            Err(e) => format!("Failed to serialize to json: {e}"),
        }
    }

    /// Writes `model` as pretty JSON. Falls back to `filename` in the working
    /// directory when no path is given.
    pub fn save_to_json<T>(
        model: T,
        path: Option<PathBuf>,
        filename: &str,
    ) -> Result<PathBuf, UtilError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string_pretty(&model)?;
        let write_path = Self::prepare_path(path, filename, "json")?;
        std::fs::write(&write_path, json)?;
        Ok(write_path)
    }

    pub fn save_to_yaml<T>(
        model: T,
        path: Option<PathBuf>,
        filename: &str,
    ) -> Result<PathBuf, UtilError>
    where
        T: Serialize,
    {
        let yaml = serde_yaml::to_string(&model)?;
        let write_path = Self::prepare_path(path, filename, "yaml")?;
        std::fs::write(&write_path, yaml)?;
        Ok(write_path)
    }

    /// Reads a JSON or YAML document, picking the format from the extension
    pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, UtilError> {
        let content = std::fs::read_to_string(path)?;

        match DocumentFormat::from_path(path)? {
            DocumentFormat::Json => serde_json::from_str(&content)
                .map_err(|e| UtilError::DeSerializeError(format!("{}: {e}", path.display()))),
            DocumentFormat::Yaml => serde_yaml::from_str(&content)
                .map_err(|e| UtilError::DeSerializeError(format!("{}: {e}", path.display()))),
        }
    }

    fn prepare_path(
        path: Option<PathBuf>,
        filename: &str,
        extension: &str,
    ) -> Result<PathBuf, UtilError> {
        let Some(mut new_path) = path else {
            return Ok(PathBuf::from(filename));
        };

        new_path.set_extension(extension);

        if !new_path.exists() {
            if let Some(parent_path) = new_path.parent() {
                if !parent_path.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent_path)
                        .map_err(|_| UtilError::CreateDirectoryError)?;
                }
            }
        }

        Ok(new_path)
    }
}
