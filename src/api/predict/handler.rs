// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction endpoint handler

use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::Multipart;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::response::PredictResponse;
use crate::api::errors::ApiError;
use crate::api::server::AppState;
use crate::api::upload::{allowed_file, save_upload};
use crate::cache::PredictionCache;

/// Name of the multipart field carrying the image
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
pub struct PredictParams {
    /// Include the per-strategy trace in the response
    #[serde(default)]
    pub debug: bool,
}

/// POST /predict - Recognize handwriting in an uploaded image
///
/// # Request
/// - multipart form with the image in the `file` field
/// - `?debug=true` adds the candidate trace to uncached responses
///
/// # Response
/// - `recognized_text`: Selected text or "(No text detected in image)"
/// - `cache_hit`: Whether an identical upload was answered from cache
///
/// # Errors
/// - 400 Bad Request: Missing file part, empty filename, disallowed extension
/// - 500 Internal Server Error: Upload could not be saved, recognition failed
pub async fn predict_handler(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    // 1. Find the file part and validate it
    let (filename, bytes) = read_file_field(&mut multipart, &state.upload.allowed_extensions).await?;
    debug!("Upload received: {} ({} bytes)", filename, bytes.len());

    // 2. Save; the guard removes the file once the request is done
    let saved = save_upload(&state.upload.dir, &filename, &bytes)
        .await
        .map_err(|e| ApiError::SaveFailed(e.to_string()))?;

    // 3. Cache lookup by content
    let hash = PredictionCache::hash_bytes(&bytes);
    if let Some(text) = state.cache.get(&hash).await {
        info!("Cache hit for {}", filename);
        return Ok(Json(PredictResponse::new(text, true)));
    }

    // 4. Recognize, one request at a time
    let recognition = {
        let _lock = state.predict_lock.lock().await;
        state.predictor.predict(saved.path()).await
    }
    .map_err(|e| ApiError::Processing(e.to_string()))?;

    info!(
        "Recognized {} with {}: {:?}",
        filename,
        state.predictor.name(),
        recognition.text
    );

    state
        .cache
        .insert(hash, recognition.text.clone())
        .await;

    let response = PredictResponse::new(recognition.text, false);
    Ok(Json(if params.debug {
        response.with_trace(recognition.trace)
    } else {
        response
    }))
}

async fn read_file_field(
    multipart: &mut Multipart,
    allowed_extensions: &[String],
) -> Result<(String, Bytes), ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ApiError::MissingFile),
            Err(e) => {
                warn!("Malformed multipart body: {}", e);
                return Err(ApiError::InvalidRequest(e.to_string()));
            }
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::NoFileSelected);
        }

        if !allowed_file(&filename, allowed_extensions) {
            return Err(ApiError::invalid_file_type(allowed_extensions));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        return Ok((filename, bytes));
    }
}
