// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction response types

use serde::{Deserialize, Serialize};

use crate::vision::Candidate;

/// Response from POST /predict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Always true; failures use `ErrorResponse`
    pub success: bool,
    /// Selected text, or the no-text sentinel
    pub recognized_text: String,
    /// Whether the text came from the prediction cache
    pub cache_hit: bool,
    /// Per-strategy candidates, only with `?debug=true` on a cache miss
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace: Option<Vec<Candidate>>,
}

impl PredictResponse {
    pub fn new(recognized_text: String, cache_hit: bool) -> Self {
        Self {
            success: true,
            recognized_text,
            cache_hit,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: Vec<Candidate>) -> Self {
        self.trace = Some(trace);
        self
    }
}
