// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod version;
pub mod vision;

pub use api::{create_router, AppState};
pub use cache::PredictionCache;
pub use config::{AppConfig, Backend, ConfigError};
pub use vision::{
    build_predictor, Candidate, DetectionItem, DetectionOptions, EngineError,
    MultiStrategyRecognizer, Predictor, RecognizeError, Recognition, TextDetector,
    NO_TEXT_DETECTED,
};
