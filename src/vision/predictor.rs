// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Interchangeable handwriting predictors
//!
//! The service holds one `Arc<dyn Predictor>` chosen at start-up from the
//! engine configuration. When the configured sidecar is unreachable the
//! factory hands back the mock predictor instead of failing start-up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::easyocr_client::EasyOcrClient;
use super::engine::{EngineError, SampleTextDetector, TextDetector};
use super::recognizer::{Candidate, MultiStrategyRecognizer, RecognizeError, Recognition, NO_TEXT_DETECTED};
use super::trocr_client::TrOcrClient;
use crate::config::{Backend, EngineConfig};

/// A handwriting recognizer the service can be configured with
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Backend name reported by the health endpoint
    fn name(&self) -> &str;

    /// Whether a real OCR engine is behind this predictor
    fn is_loaded(&self) -> bool;

    async fn predict(&self, image_path: &Path) -> Result<Recognition, RecognizeError>;

    /// Predict each image in turn
    async fn predict_batch(
        &self,
        image_paths: &[PathBuf],
    ) -> Vec<Result<Recognition, RecognizeError>> {
        let mut results = Vec::with_capacity(image_paths.len());
        for path in image_paths {
            results.push(self.predict(path).await);
        }
        results
    }
}

/// Multi-strategy voting over any [`TextDetector`]
pub struct MultiStrategyPredictor {
    name: String,
    loaded: bool,
    recognizer: MultiStrategyRecognizer,
}

impl MultiStrategyPredictor {
    pub fn new(name: &str, detector: Arc<dyn TextDetector>, loaded: bool) -> Self {
        Self {
            name: name.to_string(),
            loaded,
            recognizer: MultiStrategyRecognizer::new(detector),
        }
    }

    /// Placeholder predictor reporting sample texts
    pub fn mock() -> Self {
        Self::new("mock", Arc::new(SampleTextDetector::new()), false)
    }
}

#[async_trait]
impl Predictor for MultiStrategyPredictor {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    async fn predict(&self, image_path: &Path) -> Result<Recognition, RecognizeError> {
        self.recognizer.recognize(image_path).await
    }
}

/// Single-pass TrOCR recognition
pub struct TrOcrPredictor {
    client: TrOcrClient,
}

impl TrOcrPredictor {
    pub fn new(client: TrOcrClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Predictor for TrOcrPredictor {
    fn name(&self) -> &str {
        "trocr"
    }

    fn is_loaded(&self) -> bool {
        true
    }

    async fn predict(&self, image_path: &Path) -> Result<Recognition, RecognizeError> {
        if !tokio::fs::metadata(image_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Err(RecognizeError::InputNotFound(image_path.to_path_buf()));
        }

        let text = self.client.recognize(image_path).await?;
        let candidate = Candidate {
            strategy: self.client.variant().model_name().to_string(),
            items: usize::from(!text.is_empty()),
            mean_confidence: if text.is_empty() { 0.0 } else { 1.0 },
            text: text.clone(),
        };

        Ok(Recognition {
            text: if text.is_empty() {
                NO_TEXT_DETECTED.to_string()
            } else {
                text
            },
            trace: vec![candidate],
        })
    }
}

/// Build the predictor selected by `config`
///
/// Probes the sidecar once; an unreachable sidecar yields the mock predictor.
pub async fn build_predictor(config: &EngineConfig) -> Result<Arc<dyn Predictor>, EngineError> {
    match config.backend {
        Backend::EasyOcr => {
            let client = EasyOcrClient::new(
                &config.easyocr_url,
                config.languages.clone(),
                config.request_timeout(),
            )?;
            if client.health_check().await {
                info!("✅ EasyOCR sidecar ready at {}", client.endpoint());
                return Ok(Arc::new(MultiStrategyPredictor::new(
                    "easyocr",
                    Arc::new(client),
                    true,
                )));
            }
            warn!(
                "⚠️ EasyOCR sidecar at {} not reachable, using mock predictions",
                config.easyocr_url
            );
        }
        Backend::TrOcr => {
            let client = TrOcrClient::new(
                &config.trocr_url,
                config.trocr_variant,
                config.request_timeout(),
            )?;
            if client.health_check().await {
                info!(
                    "✅ TrOCR sidecar ready ({})",
                    client.variant().model_name()
                );
                return Ok(Arc::new(TrOcrPredictor::new(client)));
            }
            warn!(
                "⚠️ TrOCR sidecar at {} not reachable, using mock predictions",
                config.trocr_url
            );
        }
        Backend::Mock => info!("Mock predictor selected"),
    }

    Ok(Arc::new(MultiStrategyPredictor::mock()))
}
