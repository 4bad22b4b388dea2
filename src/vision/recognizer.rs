// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multi-strategy recognition
//!
//! Runs the engine over a fixed set of (image variant, magnification)
//! strategies, scores each run by the mean confidence of its fragments and
//! keeps the best non-empty result. Only a missing input file is fatal;
//! engine and preprocessing failures just shrink the candidate pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::engine::{DetectionItem, DetectionOptions, EngineError, TextDetector};
use super::preprocessing::{preprocessed_path, write_enhanced, TempFileGuard};

/// Result text when no strategy produced any text
pub const NO_TEXT_DETECTED: &str = "(No text detected in image)";

/// Magnifications tried on every image variant
pub const MAGNIFICATIONS: [f32; 2] = [1.5, 2.0];

#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("Image file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("OCR engine failed: {0}")]
    Engine(#[from] EngineError),
}

/// Which image a strategy runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageVariant {
    Original,
    Enhanced,
}

impl ImageVariant {
    fn label(self) -> &'static str {
        match self {
            ImageVariant::Original => "original",
            ImageVariant::Enhanced => "preprocessed",
        }
    }
}

/// One (image variant, magnification) configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub description: String,
    pub variant: ImageVariant,
    pub magnification: f32,
}

impl Strategy {
    pub fn new(variant: ImageVariant, magnification: f32) -> Self {
        Self {
            description: format!("{}_mag{:.1}", variant.label(), magnification),
            variant,
            magnification,
        }
    }

    /// Strategies for one recognition call, in evaluation order
    ///
    /// The enhanced variants are only included when preprocessing succeeded.
    pub fn plan(with_enhanced: bool) -> Vec<Strategy> {
        let mut strategies: Vec<Strategy> = MAGNIFICATIONS
            .iter()
            .map(|mag| Strategy::new(ImageVariant::Original, *mag))
            .collect();

        if with_enhanced {
            strategies.extend(
                MAGNIFICATIONS
                    .iter()
                    .map(|mag| Strategy::new(ImageVariant::Enhanced, *mag)),
            );
        }

        strategies
    }

    pub fn options(&self) -> DetectionOptions {
        DetectionOptions::with_magnification(self.magnification)
    }
}

/// Aggregated result of one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub strategy: String,
    pub text: String,
    #[serde(rename = "avg_conf")]
    pub mean_confidence: f32,
    /// Number of fragments that contributed text
    pub items: usize,
}

/// Outcome of a recognition call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub text: String,
    /// Every candidate, in evaluation order
    pub trace: Vec<Candidate>,
}

impl Recognition {
    /// Whether the text is the no-text sentinel
    pub fn is_empty(&self) -> bool {
        self.text == NO_TEXT_DETECTED
    }
}

/// Join the trimmed, non-empty fragment texts and average their confidences
pub fn aggregate_detections(strategy: &str, items: &[DetectionItem]) -> Candidate {
    let mut texts = Vec::with_capacity(items.len());
    let mut total = 0.0f32;

    for item in items {
        let text = item.text.trim();
        if text.is_empty() {
            continue;
        }
        texts.push(text);
        total += item.confidence;
    }

    let mean_confidence = if texts.is_empty() {
        0.0
    } else {
        total / texts.len() as f32
    };

    Candidate {
        strategy: strategy.to_string(),
        text: texts.join(" ").trim().to_string(),
        mean_confidence,
        items: texts.len(),
    }
}

/// Pick the candidate with the strictly greatest mean confidence among those
/// with text; earlier candidates win ties.
pub fn select_best(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;

    for candidate in candidates.iter().filter(|c| !c.text.is_empty()) {
        let better = match best {
            Some(current) => candidate.mean_confidence > current.mean_confidence,
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }

    best
}

/// Recognizer that votes across engine runs
pub struct MultiStrategyRecognizer {
    detector: Arc<dyn TextDetector>,
}

impl MultiStrategyRecognizer {
    pub fn new(detector: Arc<dyn TextDetector>) -> Self {
        Self { detector }
    }

    /// Recognize the text in the image at `image_path`
    ///
    /// Writes `<image_path>.proc.png` while running; the file is removed
    /// before this returns, whatever the outcome.
    pub async fn recognize(&self, image_path: &Path) -> Result<Recognition, RecognizeError> {
        let readable = tokio::fs::metadata(image_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !readable {
            return Err(RecognizeError::InputNotFound(image_path.to_path_buf()));
        }

        let enhanced = self.prepare_enhanced(image_path).await;

        let mut trace = Vec::new();
        for strategy in Strategy::plan(enhanced.is_some()) {
            let source = match (strategy.variant, &enhanced) {
                (ImageVariant::Original, _) => image_path,
                (ImageVariant::Enhanced, Some(guard)) => guard.path(),
                (ImageVariant::Enhanced, None) => continue,
            };

            let items = match self.detector.detect_text(source, strategy.options()).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(
                        "OCR engine error for {} ({}): {}",
                        source.display(),
                        strategy.description,
                        e
                    );
                    Vec::new()
                }
            };

            let candidate = aggregate_detections(&strategy.description, &items);
            debug!(
                "Strategy {}: {:?} (avg_conf {:.3}, {} items)",
                candidate.strategy, candidate.text, candidate.mean_confidence, candidate.items
            );
            trace.push(candidate);
        }

        drop(enhanced);

        let text = match select_best(&trace) {
            Some(best) => {
                info!(
                    "Selected {} with avg_conf {:.3}",
                    best.strategy, best.mean_confidence
                );
                best.text.clone()
            }
            None => {
                info!("No strategy detected text in {}", image_path.display());
                NO_TEXT_DETECTED.to_string()
            }
        };

        Ok(Recognition { text, trace })
    }

    /// Write the enhanced variant next to `source`
    ///
    /// The guard is created and returned by the blocking task itself, so
    /// the file is still removed when this future is dropped mid-write.
    async fn prepare_enhanced(&self, source: &Path) -> Option<TempFileGuard> {
        let source = source.to_path_buf();
        let task = tokio::task::spawn_blocking(move || {
            let guard = TempFileGuard::new(preprocessed_path(&source));
            write_enhanced(&source, guard.path()).map(|()| guard)
        });

        match task.await {
            Ok(Ok(guard)) => Some(guard),
            Ok(Err(e)) => {
                warn!("Preprocessing error: {}", e);
                None
            }
            Err(e) => {
                warn!("Preprocessing task failed: {}", e);
                None
            }
        }
    }
}
