//! API Server

use super::{handlers::AppState, routes::ApiRouter};
use crate::{data::RecordStore, metrics::Metrics, Result};
use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info};

/// HTTP server for the records API
pub struct ApiServer {
    bind_addr: SocketAddr,
    app_state: AppState,
    cors_allow_origins: Vec<String>,
}

impl ApiServer {
    pub fn new(
        bind_addr: SocketAddr,
        metrics: Arc<Metrics>,
        store: Arc<dyn RecordStore>,
        cors_allow_origins: Vec<String>,
    ) -> Self {
        Self {
            bind_addr,
            app_state: AppState::new(metrics, store),
            cors_allow_origins,
        }
    }

    /// Serve until a message arrives on `shutdown`, then drain in-flight requests
    pub async fn start(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!("Starting API server on {}", self.bind_addr);

        let app = ApiRouter::create_router(self.app_state, &self.cors_allow_origins);

        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind API server to {}", self.bind_addr))?;

        info!("API server listening on {}", self.bind_addr);

        let graceful = async move {
            let _ = shutdown.recv().await;
            info!("API server stopping, draining in-flight requests");
        };

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .await
        {
            error!("API server error: {}", e);
            return Err(e.into());
        }

        info!("API server stopped");
        Ok(())
    }

    /// Create a router for testing
    pub fn create_test_router(&self) -> Router {
        ApiRouter::create_router(self.app_state.clone(), &self.cors_allow_origins)
    }
}
