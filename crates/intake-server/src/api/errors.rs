//! Error handling for the Workflow Intake API
//!
//! This module contains standardized error handling for the API.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::error::ServerError;

/// API Error type for returning standard error responses
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),
    /// Wrapped server error
    ServerError(ServerError),
}

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        ApiError::ServerError(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::ServerError(err) => write!(f, "Server Error: {}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, "ERR_BAD_REQUEST", &msg, None),
            ApiError::ServerError(err) => api_error_response(&err),
        }
    }
}

/// Standard error body, with extra fields merged into the top level
fn error_body(
    status: StatusCode,
    error_code: &str,
    message: &str,
    extra: Option<Value>,
) -> axum::response::Response {
    let mut body = json!({
        "error": message,
        "errorDetails": {
            "errorCode": error_code,
            "errorMessage": message,
        }
    });

    if let (Some(Value::Object(extra)), Some(object)) = (extra, body.as_object_mut()) {
        object.extend(extra);
    }

    (status, Json(body)).into_response()
}

/// Convert a server error into its HTTP response
pub fn api_error_response(err: &ServerError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        ServerError::MissingRequiredField { field } => error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            "ERR_MISSING_REQUIRED_FIELD",
            &message,
            Some(json!({ "field": field })),
        ),
        ServerError::ConcurrentModification { path } => error_body(
            StatusCode::CONFLICT,
            "ERR_CONCURRENT_MODIFICATION",
            &message,
            Some(json!({ "path": path })),
        ),
        ServerError::SchemaMismatch(_) => error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERR_SCHEMA_MISMATCH",
            &message,
            None,
        ),
        ServerError::StoreUnavailable { payload, .. } => error_body(
            StatusCode::SERVICE_UNAVAILABLE,
            "ERR_STORE_UNAVAILABLE",
            &message,
            Some(json!({ "payload": payload })),
        ),
        ServerError::BadRequest(_) => error_body(StatusCode::BAD_REQUEST, "ERR_BAD_REQUEST", &message, None),
        ServerError::ConfigError(_) => error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERR_CONFIG_ERROR",
            &message,
            None,
        ),
        ServerError::Io(_) | ServerError::InternalError(_) => error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERR_INTERNAL_SERVER_ERROR",
            &message,
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_field_carries_field_name() {
        let response = api_error_response(&ServerError::MissingRequiredField {
            field: "steps[1].title".to_string(),
        });
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["field"], "steps[1].title");
        assert_eq!(body["errorDetails"]["errorCode"], "ERR_MISSING_REQUIRED_FIELD");
    }

    #[tokio::test]
    async fn test_store_unavailable_carries_payload() {
        let response = api_error_response(&ServerError::StoreUnavailable {
            message: "timeout".to_string(),
            payload: Some("{\"doc\":{}}".to_string()),
        });
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["payload"], "{\"doc\":{}}");
        assert!(body["error"].as_str().unwrap().contains("try again later"));
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_server_error() {
        let response = ApiError::from(ServerError::SchemaMismatch("bad".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Could not load existing workflow"));
    }
}
