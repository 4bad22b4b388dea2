// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! TrOCR sidecar client
//!
//! TrOCR is a line-level transformer recognizer: one image in, one string
//! out. There are no fragments or confidences to vote over.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::engine::EngineError;
use super::image_utils::encode_file_base64;

/// TrOCR checkpoints served by the sidecar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrOcrVariant {
    #[default]
    Handwritten,
    Printed,
    Large,
}

impl TrOcrVariant {
    pub fn model_name(self) -> &'static str {
        match self {
            TrOcrVariant::Handwritten => "microsoft/trocr-base-handwritten",
            TrOcrVariant::Printed => "microsoft/trocr-base-printed",
            TrOcrVariant::Large => "microsoft/trocr-large-handwritten",
        }
    }
}

impl FromStr for TrOcrVariant {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to the handwritten checkpoint
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "printed" => TrOcrVariant::Printed,
            "large" => TrOcrVariant::Large,
            _ => TrOcrVariant::Handwritten,
        })
    }
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    image: String,
    model: &'a str,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    text: String,
}

/// Client for a TrOCR `recognize` sidecar
pub struct TrOcrClient {
    client: Client,
    endpoint: String,
    variant: TrOcrVariant,
}

impl TrOcrClient {
    pub fn new(endpoint: &str, variant: TrOcrVariant, timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!(
            "TrOCR client configured: endpoint={}, model={}",
            endpoint,
            variant.model_name()
        );

        Ok(Self {
            client,
            endpoint,
            variant,
        })
    }

    pub fn variant(&self) -> TrOcrVariant {
        self.variant
    }

    pub async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("TrOCR health check failed: {}", e);
                false
            }
        }
    }

    /// Generate text for the image at `image`, trimmed
    pub async fn recognize(&self, image: &Path) -> Result<String, EngineError> {
        let request = RecognizeRequest {
            image: encode_file_base64(image).await?,
            model: self.variant.model_name(),
        };

        let response = self
            .client
            .post(format!("{}/v1/recognize", self.endpoint))
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

        let body: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;

        Ok(body.text.trim().to_string())
    }
}
