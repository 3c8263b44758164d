//! Health check endpoint for the Workflow Intake Server

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::server::IntakeServer;

/// Health check handler
///
/// Reports the server version and whether the document store answers.
pub async fn health_check(State(server): State<Arc<IntakeServer>>) -> impl IntoResponse {
    debug!("Health check requested");

    let mut response = json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION"),
        "dependencies": {},
    });

    let document_store_status = match server.check_document_store_health().await {
        Ok(true) => "UP",
        Ok(false) => "DEGRADED",
        Err(_) => "DOWN",
    };
    response["dependencies"]["documentStore"] = json!({
        "status": document_store_status,
    });

    let status = if document_store_status == "DOWN" {
        response["status"] = json!("DOWN");
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status, Json(response))
}
