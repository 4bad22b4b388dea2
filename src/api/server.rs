// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::{clear_cache_handler, health_handler};
use super::predict::predict_handler;
use crate::cache::PredictionCache;
use crate::config::UploadConfig;
use crate::vision::Predictor;

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<dyn Predictor>,
    pub cache: Arc<PredictionCache>,
    pub upload: Arc<UploadConfig>,
    /// Serializes predictor use across requests
    pub predict_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(predictor: Arc<dyn Predictor>, cache: PredictionCache, upload: UploadConfig) -> Self {
        Self {
            predictor,
            cache: Arc::new(cache),
            upload: Arc::new(upload),
            predict_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.upload.max_bytes;

    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Handwriting recognition
        .route("/predict", post(predict_handler))
        // Cache maintenance
        .route("/clear_cache", post(clear_cache_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `addr` until Ctrl+C
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
