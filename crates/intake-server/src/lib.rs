//!
//! Workflow Intake Server - HTTP surface for the workflow description form
//!
//! This module exports all the components of the Workflow Intake Server.

use std::sync::Arc;

use intake_store::{
    github::GitHubDocumentStore, memory::InMemoryDocumentStore, CommitIdentity, DocumentStorage,
};

/// API module
pub mod api;

/// Server module
pub mod server;

/// Form session actions
pub mod session;

/// Configuration module
pub mod config;

/// Error module
pub mod error;

// Re-export key types
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::IntakeServer;
pub use session::{InputDataReceipt, InputFile, LoadOutcome, WorkflowSession};

/// Run function
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    // Initialize logging
    init_logging(&config);

    let document_store = create_document_store(&config)?;
    let server = IntakeServer::new(config, document_store);

    server.run().await
}

/// Initialize logging
fn init_logging(config: &ServerConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    // Create filter based on config
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // A subscriber may already be installed (tests, embedding)
    let result = if config.json_logs {
        fmt().json().with_env_filter(filter).with_target(true).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };

    if let Err(e) = result {
        tracing::debug!("Logging already initialized: {}", e);
    }
}

/// Create the document store selected by `document_store_url`
pub fn create_document_store(config: &ServerConfig) -> ServerResult<Arc<dyn DocumentStorage>> {
    let identity = CommitIdentity::new(&config.committer_name, &config.committer_email);

    if config.document_store_url.starts_with("memory://") {
        // Use in-memory document store for development and testing
        tracing::info!("Using in-memory document store");
        Ok(Arc::new(InMemoryDocumentStore::with_identity(identity)))
    } else if let Some(repository) = config.document_store_url.strip_prefix("github://") {
        // Format: github://{owner}/{repo}
        let api_token = config.github_api_key.clone().ok_or_else(|| {
            ServerError::ConfigError("Missing GITHUB_API_KEY for github:// document store".to_string())
        })?;

        tracing::info!(
            "Using GitHub document store {} on branch {}",
            repository,
            config.github_branch
        );
        let store = GitHubDocumentStore::new(
            repository.trim_end_matches('/'),
            api_token,
            config.github_branch.clone(),
            identity,
        )?
        .with_api_base_url(&config.github_api_url)
        .with_lfs_base_url(&config.github_lfs_url);

        Ok(Arc::new(store))
    } else {
        Err(ServerError::ConfigError(format!(
            "Unsupported document store URL: {}",
            config.document_store_url
        )))
    }
}
