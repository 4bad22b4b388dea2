// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// False when the mock predictor stands in for a real engine
    pub model_loaded: bool,
    pub backend: String,
    pub cache_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearCacheResponse {
    pub success: bool,
    pub message: String,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: state.predictor.is_loaded(),
        backend: state.predictor.name().to_string(),
        cache_size: state.cache.len().await,
    })
}

/// POST /clear_cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    let removed = state.cache.clear().await;
    info!("Prediction cache cleared ({} entries)", removed);

    Json(ClearCacheResponse {
        success: true,
        message: format!("Cache cleared. Removed {} entries.", removed),
    })
}
