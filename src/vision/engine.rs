// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR engine capability and detection normalization
//!
//! Every engine adapter maps whatever its backend reports into
//! [`DetectionItem`] through [`normalize_detection`], so the recognizer
//! never inspects raw engine output.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Keys accepted for the text of a keyed detection record, in priority order
const TEXT_KEYS: &[&str] = &["text", "Text", "label"];

/// Keys accepted for the confidence of a keyed detection record, in priority order
const CONFIDENCE_KEYS: &[&str] = &["confidence", "conf", "score"];

/// Texts reported by the placeholder engine
pub const SAMPLE_TEXTS: &[&str] = &[
    "Sample handwritten text",
    "Hello World!",
    "This is a demo prediction",
    "Handwriting recognition",
    "Upload your handwritten image",
];

/// Errors raised by an engine invocation
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Options passed to the engine for one detection run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionOptions {
    /// Merge detections into paragraphs
    pub paragraph: bool,
    /// Magnification applied by the engine before detection
    pub mag_ratio: f32,
}

impl DetectionOptions {
    pub fn with_magnification(mag_ratio: f32) -> Self {
        Self {
            paragraph: false,
            mag_ratio,
        }
    }
}

/// One text fragment reported by an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionItem {
    /// Recognized text, untrimmed
    pub text: String,
    /// Confidence score (nominally 0.0-1.0)
    pub confidence: f32,
}

impl DetectionItem {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Text detection capability of an OCR engine
///
/// Implementations may fail per call; callers treat a failure as "no
/// detections" for that run rather than aborting.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextDetector: Send + Sync {
    /// Detect text fragments in the image at `image`
    async fn detect_text(
        &self,
        image: &Path,
        options: DetectionOptions,
    ) -> Result<Vec<DetectionItem>, EngineError>;

    /// Check whether the engine behind this detector is reachable
    async fn health_check(&self) -> bool;
}

/// Map one raw engine output unit into a [`DetectionItem`]
///
/// Accepted shapes:
/// - `[region, text, confidence, ...]`
/// - `[region, text]` (confidence 0.0)
/// - `{ "text" | "Text" | "label": ..., "confidence" | "conf" | "score": ... }`
///
/// Returns `None` for any other shape, or when the text is missing or empty.
/// A confidence that is not numeric counts as 0.0.
pub fn normalize_detection(item: &Value) -> Option<DetectionItem> {
    let (text, confidence) = match item {
        Value::Array(seq) if seq.len() >= 3 => (seq.get(1), seq.get(2)),
        Value::Array(seq) if seq.len() == 2 => (seq.get(1), None),
        Value::Object(record) => (
            first_truthy(TEXT_KEYS.iter().filter_map(|key| record.get(*key))),
            first_truthy(CONFIDENCE_KEYS.iter().filter_map(|key| record.get(*key))),
        ),
        _ => return None,
    };

    let text = text.and_then(text_value)?;
    if text.is_empty() {
        return None;
    }

    Some(DetectionItem {
        text,
        confidence: confidence.map(confidence_value).unwrap_or(0.0),
    })
}

fn first_truthy<'a>(mut values: impl Iterator<Item = &'a Value>) -> Option<&'a Value> {
    values.find(|value| is_truthy(value))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn confidence_value(value: &Value) -> f32 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0) as f32,
        Value::String(s) => s.trim().parse::<f32>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/// Placeholder engine used when no real OCR backend is available
///
/// Reports a single sample text per call, picked by a stable hash of the
/// image path, so the same upload always yields the same answer.
#[derive(Debug, Default, Clone)]
pub struct SampleTextDetector;

impl SampleTextDetector {
    pub fn new() -> Self {
        Self
    }

    /// The sample text reported for `image`
    pub fn sample_for(image: &Path) -> &'static str {
        let digest = Sha256::digest(image.to_string_lossy().as_bytes());
        let index = u64::from_be_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
            digest[7],
        ]) % SAMPLE_TEXTS.len() as u64;
        SAMPLE_TEXTS[index as usize]
    }
}

#[async_trait]
impl TextDetector for SampleTextDetector {
    async fn detect_text(
        &self,
        image: &Path,
        _options: DetectionOptions,
    ) -> Result<Vec<DetectionItem>, EngineError> {
        Ok(vec![DetectionItem::new(Self::sample_for(image), 1.0)])
    }

    async fn health_check(&self) -> bool {
        false
    }
}
