use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SettingsError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    SchemaError(#[from] fieldmatch_types::SchemaError),
}
