use thiserror::Error;

/// Errors raised while mapping between drafts and pipeline documents
#[derive(Error, Debug)]
pub enum MappingError {
    /// A field that must be non-empty was empty, e.g. `title` or `steps[2].title`
    #[error("Missing required field: {field}")]
    MissingRequiredField { field: String },

    /// A stored document does not have the pipeline document shape
    #[error("Stored document does not match the pipeline schema: {0}")]
    SchemaMismatch(String),

    /// Errors that occur while writing a document as JSON
    #[error("JSON processing error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MappingError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        MappingError::MissingRequiredField { field: field.into() }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            MappingError::MissingRequiredField { .. } => "ERR_MISSING_REQUIRED_FIELD",
            MappingError::SchemaMismatch(_) => "ERR_SCHEMA_MISMATCH",
            MappingError::Serialization(_) => "ERR_SERIALIZATION",
        }
    }
}

/// Result type for mapping operations
pub type MappingResult<T> = Result<T, MappingError>;
