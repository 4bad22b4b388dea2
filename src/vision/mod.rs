// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for handwriting recognition
//!
//! This module provides:
//! - The `TextDetector` engine capability and its sidecar adapters
//! - Contrast enhancement / adaptive binarization of input images
//! - The multi-strategy recognizer that votes across engine runs
//! - Interchangeable predictors (EasyOCR voting, TrOCR, mock)
//!
//! The OCR models themselves run out of process; this crate only
//! prepares images, calls the engines and aggregates what they report.

pub mod easyocr_client;
pub mod engine;
pub mod image_utils;
pub mod predictor;
pub mod preprocessing;
pub mod recognizer;
pub mod trocr_client;

pub use easyocr_client::EasyOcrClient;
pub use engine::{
    normalize_detection, DetectionItem, DetectionOptions, EngineError, SampleTextDetector,
    TextDetector, SAMPLE_TEXTS,
};
pub use image_utils::{detect_format, encode_file_base64, format_to_extension, ImageError};
pub use predictor::{build_predictor, MultiStrategyPredictor, Predictor, TrOcrPredictor};
pub use preprocessing::{enhance_for_ocr, preprocessed_path, PreprocessError, TempFileGuard};
pub use recognizer::{
    aggregate_detections, select_best, Candidate, ImageVariant, MultiStrategyRecognizer,
    RecognizeError, Recognition, Strategy, NO_TEXT_DETECTED,
};
pub use trocr_client::{TrOcrClient, TrOcrVariant};
