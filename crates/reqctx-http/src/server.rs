//! Axum server with the context layer mounted.
//!
//! `GET /context` reports the store each request runs with, as seen both
//! after a suspension point and from a task spawned through the storage.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::State, response::Json, routing::get};
use reqctx_core::ContextStorage;
use reqctx_middleware::{MiddlewareConfig, async_local_storage_middleware};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::layer::ContextLayer;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Enable permissive CORS
    pub enable_cors: bool,
    /// Configuration of the mounted context middleware
    pub middleware: MiddlewareConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7070,
            hostname: "127.0.0.1".into(),
            enable_cors: false,
            middleware: MiddlewareConfig::default(),
        }
    }
}

struct AppState {
    storage: ContextStorage,
}

pub struct ContextServer {
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound port
    port: u16,
}

impl ContextServer {
    /// Build the application router with the context layer mounted.
    pub fn router(config: &ServerConfig, storage: ContextStorage) -> Router {
        let middleware =
            async_local_storage_middleware(storage.clone()).configure(config.middleware.clone());
        let state = Arc::new(AppState { storage });

        let app = Router::new()
            .route("/context", get(context_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(ContextLayer::new(middleware));

        if config.enable_cors {
            app.layer(CorsLayer::permissive())
        } else {
            app
        }
    }

    pub async fn start(config: ServerConfig, storage: ContextStorage) -> Result<Self, ServerError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let app = Self::router(&config, storage);

        let addr_text = format!("{}:{}", config.hostname, config.port);
        let addr: SocketAddr = addr_text
            .parse()
            .map_err(|source| ServerError::InvalidAddress { addr: addr_text, source })?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let actual_port = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?
            .port();

        info!("Context server listening on http://{}:{}", config.hostname, actual_port);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
            {
                warn!("Context server exited with error: {e}");
            }
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Context server stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn context_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    tokio::task::yield_now().await;
    let store = state.storage.get_store();
    debug!(keys = store.as_ref().map(|s| s.len()), "Serving ambient store");

    let reader = state.storage.clone();
    let spawned = match state.storage.spawn(async move { reader.get_store() }).await {
        Ok(store) => store,
        Err(e) => {
            warn!("Store reader task failed: {e}");
            None
        }
    };

    Json(json!({
        "store": store,
        "spawned": spawned,
    }))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
