//! Main Workflow Intake Server implementation
//!
//! This module contains the IntakeServer implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use intake_store::{DocumentGateway, DocumentStorage};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::session::WorkflowSession;

/// Main server implementation
#[derive(Debug, Clone)]
pub struct IntakeServer {
    /// Configuration
    pub config: ServerConfig,

    /// Form session actions over the document store
    session: WorkflowSession,

    /// Server address (might be different from configured if port is 0)
    address: Option<SocketAddr>,
}

impl IntakeServer {
    /// Create a new IntakeServer
    pub fn new(config: ServerConfig, document_store: Arc<dyn DocumentStorage>) -> Self {
        Self {
            config,
            session: WorkflowSession::new(DocumentGateway::new(document_store)),
            address: None,
        }
    }

    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    /// Run the server
    pub async fn run(mut self) -> ServerResult<()> {
        info!("Starting Workflow Intake Server");

        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| {
                ServerError::ConfigError(format!(
                    "Invalid bind address {}:{}: {}",
                    self.config.bind_address, self.config.port, e
                ))
            })?;

        // Create and bind the TCP listener
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        // Store the actual bound address
        self.address = Some(addr);

        // Build the API router
        let app = crate::api::build_router(Arc::new(self));
        info!("Listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }

    /// Get the server's bound address
    pub fn address(&self) -> SocketAddr {
        self.address
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], self.config.port)))
    }

    /// Check that the document store answers a listing
    pub async fn check_document_store_health(&self) -> ServerResult<bool> {
        match self.session.gateway().list_children("").await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Document store health check failed: {}", e);
                Err(e.into())
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
