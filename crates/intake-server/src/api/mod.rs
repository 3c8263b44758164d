//! API module for the Workflow Intake Server
//!
//! This module contains the API routes and handlers for the Workflow Intake Server.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod errors;
pub mod health;
pub mod workflows;

use crate::server::IntakeServer;

/// Build the router for API endpoints
pub fn build_router(server: Arc<IntakeServer>) -> Router {
    Router::new()
        // Form actions
        .route("/v1/workflows/load", post(workflows::load_workflow))
        .route("/v1/workflows/steps", post(workflows::add_step))
        .route("/v1/workflows/save", post(workflows::save_workflow))
        .route("/v1/workflows/input-data", post(workflows::save_input_data))

        // Saved workflows per contact
        .route("/v1/contacts/:contact/workflows", get(workflows::list_workflows))

        // Health check
        .route("/health", get(health::health_check))

        .layer(TraceLayer::new_for_http())

        // Shared state
        .with_state(server)
}

pub use errors::{api_error_response, ApiError};
