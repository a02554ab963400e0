use fieldmatch_types::error::{SchemaError, UtilError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error(transparent)]
    SchemaError(#[from] SchemaError),

    #[error("Record id '{id}' appears more than once in the {side} records")]
    DuplicateRecordId { id: String, side: &'static str },

    #[error("Regression threshold must be finite and non-negative, got {0}")]
    InvalidRegressionThreshold(f64),

    #[error(transparent)]
    CsvError(#[from] csv::Error),

    #[error("Failed to flush CSV output: {0}")]
    CsvFlushError(String),

    #[error(transparent)]
    Utf8Error(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    UtilError(#[from] UtilError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
