//! Workflow form endpoints
//!
//! Each handler receives the draft in the request body and returns the
//! updated draft or the result of the action.

use axum::{
    extract::{Path, State},
    Json,
};
use intake_core::WorkflowDraft;
use intake_store::{FailedUpload, Revision, WriteOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::errors::ApiError;
use crate::server::IntakeServer;
use crate::session::{InputFile, LoadOutcome};

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub contact: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<WorkflowDraft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub draft: WorkflowDraft,
}

#[derive(Debug, Serialize)]
pub struct AddStepResponse {
    pub draft: WorkflowDraft,
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub draft: WorkflowDraft,
    /// Revision returned by the load this draft came from
    #[serde(default)]
    pub revision: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub path: String,
    pub outcome: WriteOutcome,
    pub revision: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    /// Base64 encoded file content
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct InputDataRequest {
    pub draft: WorkflowDraft,
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDataResponse {
    pub readme_path: String,
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedUpload>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowListResponse {
    pub contact: String,
    pub workflows: Vec<String>,
}

/// POST /v1/workflows/load
pub async fn load_workflow(
    State(server): State<Arc<IntakeServer>>,
    Json(request): Json<LoadRequest>,
) -> Result<Json<LoadResponse>, ApiError> {
    let response = match server.session().load(&request.contact, &request.title).await? {
        LoadOutcome::Loaded { draft, revision } => LoadResponse {
            found: true,
            draft: Some(draft),
            revision: Some(revision.into_string()),
        },
        LoadOutcome::NotFound => LoadResponse {
            found: false,
            draft: None,
            revision: None,
        },
    };
    Ok(Json(response))
}

/// POST /v1/workflows/steps
pub async fn add_step(
    State(server): State<Arc<IntakeServer>>,
    Json(request): Json<DraftRequest>,
) -> Json<AddStepResponse> {
    let (draft, index) = server.session().add_step(request.draft);
    Json(AddStepResponse { draft, index })
}

/// POST /v1/workflows/save
pub async fn save_workflow(
    State(server): State<Arc<IntakeServer>>,
    Json(request): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    let expected = request
        .revision
        .filter(|revision| !revision.is_empty())
        .map(Revision::new);

    let receipt = server.session().save(&request.draft, expected).await?;
    Ok(Json(SaveResponse {
        path: receipt.path,
        outcome: receipt.outcome,
        revision: receipt.revision.into_string(),
    }))
}

/// POST /v1/workflows/input-data
pub async fn save_input_data(
    State(server): State<Arc<IntakeServer>>,
    Json(request): Json<InputDataRequest>,
) -> Result<Json<InputDataResponse>, ApiError> {
    let files = request
        .files
        .into_iter()
        .map(|file| {
            let content = base64::decode(file.content.trim()).map_err(|e| {
                ApiError::BadRequest(format!("File '{}' is not valid base64: {}", file.name, e))
            })?;
            Ok(InputFile {
                name: file.name,
                content,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let receipt = server.session().save_input_data(&request.draft, files).await?;
    Ok(Json(InputDataResponse {
        readme_path: receipt.readme_path,
        succeeded: receipt.report.succeeded,
        failed: receipt.report.failed,
    }))
}

/// GET /v1/contacts/:contact/workflows
pub async fn list_workflows(
    State(server): State<Arc<IntakeServer>>,
    Path(contact): Path<String>,
) -> Result<Json<WorkflowListResponse>, ApiError> {
    let workflows = server.session().list_workflows(&contact).await?;
    Ok(Json(WorkflowListResponse { contact, workflows }))
}
