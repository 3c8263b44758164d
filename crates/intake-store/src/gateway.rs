//! Create-or-update writes and batched uploads on top of a DocumentStorage

use crate::{DocumentStorage, Revision, StoreResult, StoredObject};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether a write created a new object or replaced one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    Created,
    Updated,
}

/// Result of a successful document write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub path: String,
    pub outcome: WriteOutcome,
    pub revision: Revision,
}

/// One file of an upload batch
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Name as supplied by the user, used in messages and reports
    pub name: String,
    pub path: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUpload {
    pub name: String,
    pub reason: String,
}

/// Per-file outcome of an upload batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedUpload>,
}

impl UploadReport {
    pub fn record_success(&mut self, name: impl Into<String>) {
        self.succeeded.push(name.into());
    }

    pub fn record_failure(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.failed.push(FailedUpload {
            name: name.into(),
            reason: reason.into(),
        });
    }

    /// True when no file failed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Persistence operations used by the form session
#[derive(Debug, Clone)]
pub struct DocumentGateway {
    storage: Arc<dyn DocumentStorage>,
}

impl DocumentGateway {
    pub fn new(storage: Arc<dyn DocumentStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn DocumentStorage> {
        &self.storage
    }

    pub async fn fetch(&self, path: &str) -> StoreResult<Option<StoredObject>> {
        self.storage.fetch(path).await
    }

    pub async fn list_children(&self, directory: &str) -> StoreResult<Vec<String>> {
        self.storage.list_children(directory).await
    }

    /// Create or update `path` against whatever revision is stored right now.
    ///
    /// A concurrent write between the fetch and the put still fails with
    /// `ConcurrentModification`.
    pub async fn write_document(&self, path: &str, content: &[u8], label: &str) -> StoreResult<WriteReceipt> {
        let existing = self.storage.fetch(path).await?;
        self.write_document_at(path, content, label, existing.map(|object| object.revision))
            .await
    }

    /// Write against a revision the caller read earlier; `None` means create
    pub async fn write_document_at(
        &self,
        path: &str,
        content: &[u8],
        label: &str,
        expected: Option<Revision>,
    ) -> StoreResult<WriteReceipt> {
        let (outcome, message) = match expected {
            None => (WriteOutcome::Created, format!("create {}", label)),
            Some(_) => (
                WriteOutcome::Updated,
                format!("update {} {}", label, Utc::now().format("%Y-%m-%d %H:%M:%S UTC")),
            ),
        };

        let revision = self
            .storage
            .put(path, content, &message, expected.as_ref())
            .await?;

        info!(path, ?outcome, %revision, "Document written");
        Ok(WriteReceipt {
            path: path.to_string(),
            outcome,
            revision,
        })
    }

    /// Upload every file through the large-file channel.
    ///
    /// Files are independent: a failure is recorded and the batch continues.
    pub async fn upload_files(&self, files: Vec<FileUpload>) -> UploadReport {
        let mut report = UploadReport::default();

        for file in files {
            let message = format!("add input data: {}", file.name);
            match self
                .storage
                .put_large_file(&file.path, &file.content, &message)
                .await
            {
                Ok(()) => {
                    debug!("Uploaded {} to {}", file.name, file.path);
                    report.record_success(file.name);
                }
                Err(e) => {
                    warn!("Upload of {} to {} failed: {}", file.name, file.path, e);
                    report.record_failure(file.name, e.to_string());
                }
            }
        }

        report
    }
}
