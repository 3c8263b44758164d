//! Error types for the Workflow Intake Server
//!
//! This module contains the error types used throughout the server.

use intake_core::MappingError;
use intake_store::StoreError;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// A required draft field is empty; the user must fill it in
    #[error("Missing required field: {field}")]
    MissingRequiredField { field: String },

    /// The stored workflow could not be read back
    #[error("Could not load existing workflow: {0}")]
    SchemaMismatch(String),

    /// Someone else saved the same workflow since it was loaded
    #[error("Workflow at {path} was changed by someone else; reload and try again")]
    ConcurrentModification { path: String },

    /// Transport or auth failure talking to the document store.
    /// `payload` carries the unsaved document for manual recovery.
    #[error("Document store unavailable, try again later: {message}")]
    StoreUnavailable {
        message: String,
        payload: Option<String>,
    },

    /// Malformed request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failed to bind or serve
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

// Implement conversions from other error types
impl From<MappingError> for ServerError {
    fn from(err: MappingError) -> Self {
        match err {
            MappingError::MissingRequiredField { field } => ServerError::MissingRequiredField { field },
            MappingError::SchemaMismatch(msg) => ServerError::SchemaMismatch(msg),
            MappingError::Serialization(e) => ServerError::InternalError(format!("JSON error: {}", e)),
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrentModification { path } => ServerError::ConcurrentModification { path },
            StoreError::InvalidPath(path) => ServerError::BadRequest(format!("Invalid storage path: {}", path)),
            StoreError::ConfigurationError(msg) => ServerError::ConfigError(msg),
            StoreError::Unavailable(_) | StoreError::SerializationError(_) => ServerError::StoreUnavailable {
                message: err.to_string(),
                payload: None,
            },
        }
    }
}

impl ServerError {
    /// Attach the unsaved document to a store failure
    pub fn with_payload(self, document: String) -> Self {
        match self {
            ServerError::StoreUnavailable { message, .. } => ServerError::StoreUnavailable {
                message,
                payload: Some(document),
            },
            other => other,
        }
    }

    /// Check if the user can fix the error by editing the draft
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            ServerError::MissingRequiredField { .. } | ServerError::ConcurrentModification { .. }
        )
    }
}
