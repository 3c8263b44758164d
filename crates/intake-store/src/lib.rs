//! Workflow Intake Document Store
//!
//! Provides abstractions and implementations for a hierarchical, revision-checked
//! document store. The DocumentStorage trait defines a contract for fetching and
//! writing blobs by path, with compare-and-swap writes keyed by a revision token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use thiserror::Error;

/// Opaque token for the last known state of a stored object
/// (a git blob sha for the hosted store, "sha256:<hex_digest>" in memory)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision(String);

impl Revision {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the string representation of the revision
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A blob read from the store together with its revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub content: Vec<u8>,
    pub revision: Revision,
}

/// Author and committer attached to every write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl CommitIdentity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self::new("workflow-intake", "intake@example.com")
    }
}

/// Errors that can occur during document store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The stored object changed since its revision was read
    #[error("Concurrent modification of {path}: stored revision no longer matches")]
    ConcurrentModification { path: String },

    #[error("Storage backend unavailable: {0}")]
    Unavailable(#[from] anyhow::Error), // Catch-all for transport and auth issues

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type for DocumentStorage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Paths are relative, `/`-separated, without empty, `.` or `..` segments
pub(crate) fn validate_path(path: &str) -> StoreResult<()> {
    let invalid = path.is_empty()
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Trait defining the contract for document storage implementations
#[async_trait]
pub trait DocumentStorage: Send + Sync + std::fmt::Debug {
    /// Fetch the object stored at `path`; `None` when nothing is there
    async fn fetch(&self, path: &str) -> StoreResult<Option<StoredObject>>;

    /// Write `content` at `path` if the stored revision still equals `expected`.
    ///
    /// `expected == None` creates and requires that nothing exists yet.
    /// Any mismatch fails with [`StoreError::ConcurrentModification`] and
    /// leaves the stored object untouched.
    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        expected: Option<&Revision>,
    ) -> StoreResult<Revision>;

    /// Upload through the large-file side channel. No revision check.
    async fn put_large_file(&self, path: &str, content: &[u8], message: &str) -> StoreResult<()>;

    /// Names directly under `directory`; empty when the directory does not exist
    async fn list_children(&self, directory: &str) -> StoreResult<Vec<String>>;
}

// Re-export modules so they can be used from other crates
pub mod gateway;
pub mod github;
pub mod memory;

pub use gateway::{DocumentGateway, FailedUpload, FileUpload, UploadReport, WriteOutcome, WriteReceipt};
