use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{self, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use intake_server::{api::build_router, IntakeServer, ServerConfig};
use intake_store::memory::InMemoryDocumentStore;

fn setup_test() -> (InMemoryDocumentStore, Router) {
    let store = InMemoryDocumentStore::new();
    let config = ServerConfig {
        port: 0,
        bind_address: "127.0.0.1".to_string(),
        log_level: "debug".to_string(),
        ..ServerConfig::default()
    };
    let server = IntakeServer::new(config, Arc::new(store.clone()));
    (store, build_router(Arc::new(server)))
}

async fn send(app: &Router, method: http::Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn draft() -> Value {
    json!({
        "title": "Net analysis",
        "contact": "a@b.com",
        "contactConsent": true,
        "description": "D",
        "researchNotes": "R",
        "inputDetails": "Edges exported from the archive",
        "steps": [
            {"title": "Load CSV", "description": "", "inputs": "file.csv", "outputs": "graph"}
        ]
    })
}

#[tokio::test]
async fn test_health_check() {
    let (_, app) = setup_test();
    let (status, body) = send(&app, http::Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert_eq!(body["dependencies"]["documentStore"]["status"], "UP");
}

#[tokio::test]
async fn test_load_save_load() {
    let (store, app) = setup_test();
    let load = json!({"contact": "a@b.com", "title": "Net analysis"});

    let (status, body) = send(&app, http::Method::POST, "/v1/workflows/load", Some(load.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], false);
    assert!(body.get("draft").is_none());

    let (status, saved) = send(
        &app,
        http::Method::POST,
        "/v1/workflows/save",
        Some(json!({"draft": draft()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["path"], "a@b.com/net-analysis/pipeline.json");
    assert_eq!(saved["outcome"], "created");

    let commits = store.commits().await;
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].message, "create workflow");

    let (status, body) = send(&app, http::Method::POST, "/v1/workflows/load", Some(load)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
    assert_eq!(body["revision"], saved["revision"]);
    assert_eq!(body["draft"]["title"], "Net analysis");
    assert_eq!(body["draft"]["contactConsent"], true);
    assert_eq!(body["draft"]["researchNotes"], "R");
    assert_eq!(body["draft"]["steps"][0]["title"], "load csv");
    assert_eq!(body["draft"]["steps"][0]["inputs"], "file.csv");
}

#[tokio::test]
async fn test_save_twice_updates() {
    let (store, app) = setup_test();
    let request = json!({"draft": draft()});

    send(&app, http::Method::POST, "/v1/workflows/save", Some(request.clone())).await;
    let (status, body) = send(&app, http::Method::POST, "/v1/workflows/save", Some(request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "updated");
    assert!(store.commits().await[1].message.starts_with("update workflow "));
}

#[tokio::test]
async fn test_add_step_returns_index() {
    let (_, app) = setup_test();
    let (status, body) = send(
        &app,
        http::Method::POST,
        "/v1/workflows/steps",
        Some(json!({"draft": draft()})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["index"], 1);
    assert_eq!(body["draft"]["steps"].as_array().unwrap().len(), 2);
    assert_eq!(body["draft"]["steps"][0]["title"], "Load CSV");
}

#[tokio::test]
async fn test_missing_title_is_unprocessable() {
    let (store, app) = setup_test();
    let mut draft = draft();
    draft["title"] = json!("");

    let (status, body) = send(
        &app,
        http::Method::POST,
        "/v1/workflows/save",
        Some(json!({"draft": draft})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "title");
    assert!(store.commits().await.is_empty());
}

#[tokio::test]
async fn test_missing_step_title_is_named() {
    let (_, app) = setup_test();
    let mut draft = draft();
    draft["steps"]
        .as_array_mut()
        .unwrap()
        .push(json!({"title": "", "description": "x"}));

    let (status, body) = send(
        &app,
        http::Method::POST,
        "/v1/workflows/save",
        Some(json!({"draft": draft})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "steps[1].title");
}

#[tokio::test]
async fn test_stale_revision_conflicts() {
    let (store, app) = setup_test();

    let (_, first) = send(
        &app,
        http::Method::POST,
        "/v1/workflows/save",
        Some(json!({"draft": draft()})),
    )
    .await;
    let loaded_revision = first["revision"].clone();

    // Another tab saves on top of the same revision
    let mut other = draft();
    other["description"] = json!("other tab");
    let (status, _) = send(
        &app,
        http::Method::POST,
        "/v1/workflows/save",
        Some(json!({"draft": other, "revision": loaded_revision})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mut mine = draft();
    mine["description"] = json!("stale tab");
    let (status, body) = send(
        &app,
        http::Method::POST,
        "/v1/workflows/save",
        Some(json!({"draft": mine, "revision": loaded_revision})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errorDetails"]["errorCode"], "ERR_CONCURRENT_MODIFICATION");
    assert_eq!(store.commits().await.len(), 2);

    let (_, body) = send(
        &app,
        http::Method::POST,
        "/v1/workflows/load",
        Some(json!({"contact": "a@b.com", "title": "Net analysis"})),
    )
    .await;
    assert_eq!(body["draft"]["description"], "other tab");
}

#[tokio::test]
async fn test_malformed_stored_document_fails_load() {
    use intake_store::DocumentStorage;

    let (store, app) = setup_test();
    store
        .put("a@b.com/net-analysis/pipeline.json", b"not json", "create workflow", None)
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        http::Method::POST,
        "/v1/workflows/load",
        Some(json!({"contact": "a@b.com", "title": "Net analysis"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["errorDetails"]["errorCode"], "ERR_SCHEMA_MISMATCH");
}

#[tokio::test]
async fn test_input_data_upload() {
    let (store, app) = setup_test();

    let (status, body) = send(
        &app,
        http::Method::POST,
        "/v1/workflows/input-data",
        Some(json!({
            "draft": draft(),
            "files": [
                {"name": "edges.csv", "content": base64::encode("a,b\n1,2")},
                {"name": "///", "content": base64::encode("lost")},
                {"name": "../../nodes.csv", "content": base64::encode("id\n1")}
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["readmePath"], "a@b.com/net-analysis/data/README.md");
    assert_eq!(body["succeeded"], json!(["edges.csv", "../../nodes.csv"]));
    assert_eq!(body["failed"][0]["name"], "///");

    assert_eq!(
        store.large_file("a@b.com/net-analysis/data/nodes.csv").await,
        Some(b"id\n1".to_vec())
    );

    let (_, listing) = send(&app, http::Method::GET, "/v1/contacts/a@b.com/workflows", None).await;
    assert_eq!(listing["workflows"], json!(["net-analysis"]));
}

#[tokio::test]
async fn test_invalid_base64_is_bad_request() {
    let (store, app) = setup_test();

    let (status, body) = send(
        &app,
        http::Method::POST,
        "/v1/workflows/input-data",
        Some(json!({
            "draft": draft(),
            "files": [{"name": "edges.csv", "content": "***"}]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorDetails"]["errorCode"], "ERR_BAD_REQUEST");
    assert!(store.commits().await.is_empty());
}
