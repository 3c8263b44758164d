//! Form session actions
//!
//! Every action takes the caller's [`WorkflowDraft`] by value and hands the
//! (possibly updated) draft back. The server keeps no session state.

use intake_core::{parse_document, from_document, to_document, WorkflowDraft, WorkflowPaths};
use intake_store::{DocumentGateway, FileUpload, Revision, UploadReport, WriteReceipt};
use tracing::{debug, error, info, warn};

use crate::error::{ServerError, ServerResult};

/// Result of looking up a saved workflow
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded {
        draft: WorkflowDraft,
        revision: Revision,
    },
    /// Nothing saved yet under this contact and title
    NotFound,
}

/// One uploaded sample file, before it is given a storage path
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// Outcome of saving the input data description and files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDataReceipt {
    pub readme_path: String,
    pub report: UploadReport,
}

/// Form session controller
#[derive(Debug, Clone)]
pub struct WorkflowSession {
    gateway: DocumentGateway,
}

impl WorkflowSession {
    pub fn new(gateway: DocumentGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &DocumentGateway {
        &self.gateway
    }

    /// Load the workflow saved under `contact` and `title`.
    ///
    /// A malformed stored document fails with `SchemaMismatch` and returns no
    /// partial draft.
    pub async fn load(&self, contact: &str, title: &str) -> ServerResult<LoadOutcome> {
        let paths = WorkflowPaths::for_workflow(contact, title)?;
        let document_path = paths.document();

        let Some(stored) = self.gateway.fetch(&document_path).await? else {
            info!("No saved workflow at {}", document_path);
            return Ok(LoadOutcome::NotFound);
        };

        let document = parse_document(&stored.content).map_err(|e| {
            warn!("Stored workflow at {} is malformed: {}", document_path, e);
            ServerError::from(e)
        })?;

        let mut draft = from_document(&document);
        draft.title = title.to_string();
        if draft.contact.is_empty() {
            draft.contact = contact.to_string();
        }

        if let Some(readme) = self.gateway.fetch(&paths.data_readme()).await? {
            draft.input_details = String::from_utf8_lossy(&readme.content).into_owned();
        }

        info!(path = %document_path, steps = draft.steps.len(), "Loaded workflow");
        Ok(LoadOutcome::Loaded {
            draft,
            revision: stored.revision,
        })
    }

    /// Append an empty step; returns the draft and the new step's index
    pub fn add_step(&self, mut draft: WorkflowDraft) -> (WorkflowDraft, usize) {
        let index = draft.add_step();
        debug!("Added step {} to '{}'", index, draft.title);
        (draft, index)
    }

    /// Serialize the draft and write it.
    ///
    /// With `expected` the write is checked against that revision, otherwise
    /// against whatever is stored right now. When the store is unreachable
    /// the serialized document is logged and carried in the error.
    pub async fn save(&self, draft: &WorkflowDraft, expected: Option<Revision>) -> ServerResult<WriteReceipt> {
        let document = to_document(draft)?;
        let paths = WorkflowPaths::for_workflow(&draft.contact, &draft.title)?;
        let content = document.to_pretty_json()?;
        let path = paths.document();

        let result = match expected {
            Some(revision) => {
                self.gateway
                    .write_document_at(&path, content.as_bytes(), "workflow", Some(revision))
                    .await
            }
            None => self.gateway.write_document(&path, content.as_bytes(), "workflow").await,
        };

        result.map_err(|e| match ServerError::from(e) {
            err @ ServerError::StoreUnavailable { .. } => {
                error!(path = %path, document = %content, "Saving workflow failed: {}", err);
                err.with_payload(content.clone())
            }
            err => err,
        })
    }

    /// Write the input data description to `data/README.md`, then upload each
    /// file to `data/`.
    ///
    /// File failures, including names with no usable characters, are
    /// reported per file and do not stop the batch.
    pub async fn save_input_data(
        &self,
        draft: &WorkflowDraft,
        files: Vec<InputFile>,
    ) -> ServerResult<InputDataReceipt> {
        let paths = WorkflowPaths::for_workflow(&draft.contact, &draft.title)?;
        let readme_path = paths.data_readme();

        self.gateway
            .write_document(&readme_path, draft.input_details.as_bytes(), "input data description")
            .await
            .map_err(|e| match ServerError::from(e) {
                err @ ServerError::StoreUnavailable { .. } => {
                    error!(path = %readme_path, "Saving input data description failed: {}", err);
                    err.with_payload(draft.input_details.clone())
                }
                err => err,
            })?;

        let mut rejected = UploadReport::default();
        let mut uploads = Vec::with_capacity(files.len());
        for file in files {
            match paths.data_file(&file.name) {
                Some(path) => uploads.push(FileUpload {
                    name: file.name,
                    path,
                    content: file.content,
                }),
                None => {
                    warn!("Rejecting upload with unusable name '{}'", file.name);
                    rejected.record_failure(file.name, "file name has no usable characters");
                }
            }
        }

        let mut report = self.gateway.upload_files(uploads).await;
        report.failed.extend(rejected.failed);

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Saved input data for '{}'",
            draft.title
        );
        Ok(InputDataReceipt { readme_path, report })
    }

    /// Workflow directory names saved under `contact`
    pub async fn list_workflows(&self, contact: &str) -> ServerResult<Vec<String>> {
        let directory = WorkflowPaths::contact_dir(contact);
        Ok(self.gateway.list_children(&directory).await?)
    }
}
