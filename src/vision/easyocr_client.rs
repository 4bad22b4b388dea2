// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! EasyOCR sidecar client
//!
//! EasyOCR runs in a separate Python process exposing `readtext` over HTTP.
//! The sidecar returns EasyOCR's raw detail output, so every element goes
//! through [`normalize_detection`] before it leaves this adapter.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use super::engine::{normalize_detection, DetectionItem, DetectionOptions, EngineError, TextDetector};
use super::image_utils::{detect_format, format_to_extension};

// --- Sidecar serde structs ---

#[derive(serde::Serialize)]
struct ReadTextRequest<'a> {
    image: String,
    format: &'a str,
    languages: &'a [String],
    paragraph: bool,
    mag_ratio: f32,
    detail: u8,
}

#[derive(serde::Deserialize)]
struct ReadTextResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// Client for an EasyOCR `readtext` sidecar
pub struct EasyOcrClient {
    client: Client,
    endpoint: String,
    languages: Vec<String>,
}

impl EasyOcrClient {
    /// Create a new EasyOCR client
    pub fn new(endpoint: &str, languages: Vec<String>, timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!(
            "EasyOCR client configured: endpoint={}, languages={:?}",
            endpoint, languages
        );

        Ok(Self {
            client,
            endpoint,
            languages,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextDetector for EasyOcrClient {
    async fn detect_text(
        &self,
        image: &Path,
        options: DetectionOptions,
    ) -> Result<Vec<DetectionItem>, EngineError> {
        let bytes = tokio::fs::read(image).await?;
        let format = detect_format(&bytes)
            .map(format_to_extension)
            .unwrap_or("png");

        let request = ReadTextRequest {
            image: STANDARD.encode(&bytes),
            format,
            languages: &self.languages,
            paragraph: options.paragraph,
            mag_ratio: options.mag_ratio,
            detail: 1,
        };

        let response = self
            .client
            .post(format!("{}/v1/readtext", self.endpoint))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ReadTextResponse = response
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;

        let raw_count = body.results.len();
        let items: Vec<DetectionItem> = body.results.iter().filter_map(normalize_detection).collect();
        if items.len() < raw_count {
            debug!(
                "Skipped {} unrecognized detections from {}",
                raw_count - items.len(),
                image.display()
            );
        }

        Ok(items)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("EasyOCR health check failed: {}", e);
                false
            }
        }
    }
}
