//! HTTP surface over the voice cloner and the file store.
//!
//! Every JSON response carries a boolean `success` and a human-readable
//! `message`; failures use 400, 404, 413 or 500.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::cloner::VoiceCloner;
use crate::config::ServerConfig;
use crate::storage::{FileStore, RetentionPolicy, StorageError};
use crate::VoiceCloningEngine;

pub use error::ApiError;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub cloner: Arc<VoiceCloner>,
    pub store: Arc<FileStore>,
    pub default_language: String,
    pub retention: RetentionPolicy,
}

impl AppState {
    pub fn new(cloner: VoiceCloner, store: FileStore) -> Self {
        Self {
            cloner: Arc::new(cloner),
            store: Arc::new(store),
            default_language: crate::config::DEFAULT_LANGUAGE.to_string(),
            retention: RetentionPolicy::default(),
        }
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Create the storage directories and wrap `engine` as configured.
    pub fn from_config(
        config: &ServerConfig,
        engine: Box<dyn VoiceCloningEngine>,
    ) -> Result<Self, StorageError> {
        let store = FileStore::new(&config.uploads_dir, &config.outputs_dir)?
            .with_max_upload_bytes(config.max_upload_bytes);

        let mut cloner = VoiceCloner::new(engine, config.device.resolve());
        if let Some(temp_dir) = &config.temp_dir {
            std::fs::create_dir_all(temp_dir)?;
            cloner = cloner.with_temp_dir(temp_dir);
        }

        Ok(Self::new(cloner, store)
            .with_default_language(config.default_language.clone())
            .with_retention(config.retention))
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.store.max_upload_bytes() + MULTIPART_OVERHEAD;
    Router::new()
        .route("/initialize", post(handlers::initialize))
        .route("/upload", post(handlers::upload))
        .route("/synthesize", post(handlers::synthesize))
        .route("/download/:filename", get(handlers::download))
        .route("/cleanup", post(handlers::cleanup))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
