use std::fmt::Display;
use thiserror::Error;
use tracing::error;

pub trait TracedError: Display {
    fn trace(&self) {
        error!("{}", self);
    }
}

/// Fatal problems with a declared schema. Raised while building the schema,
/// before any record is evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Unsupported type '{type_tag}' declared for field '{field}'")]
    UnsupportedType { field: String, type_tag: String },

    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),

    #[error("Field name must not be empty")]
    EmptyFieldName,

    #[error("Invalid value {value} for '{parameter}' on field '{field}': {reason}")]
    InvalidThreshold {
        field: String,
        parameter: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Expected and actual schemas disagree on field '{field}': {expected} vs {actual}")]
    SchemaDisagreement {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("No type hint of the form [type: name] found in '{0}'")]
    MissingTypeHint(String),

    #[error("Type hints declare field '{field}' as both '{first}' and '{second}'")]
    ConflictingTypeHint {
        field: String,
        first: String,
        second: String,
    },
}

impl TracedError for SchemaError {}

impl SchemaError {
    pub fn traced_unsupported_type(field: impl Into<String>, type_tag: impl Into<String>) -> Self {
        let error = Self::UnsupportedType {
            field: field.into(),
            type_tag: type_tag.into(),
        };
        error.trace();
        error
    }
}

#[derive(Error, Debug)]
pub enum UtilError {
    #[error("Failed to serialize: {0}")]
    SerializeError(String),

    #[error("Failed to deserialize: {0}")]
    DeSerializeError(String),

    #[error("Failed to create directory")]
    CreateDirectoryError,

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl TracedError for UtilError {}

impl From<serde_json::Error> for UtilError {
    fn from(err: serde_json::Error) -> Self {
        UtilError::SerializeError(err.to_string())
    }
}

impl From<serde_yaml::Error> for UtilError {
    fn from(err: serde_yaml::Error) -> Self {
        UtilError::SerializeError(err.to_string())
    }
}
