// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction endpoint module
//!
//! Provides POST /predict for recognizing handwriting in an uploaded image.

pub mod handler;
pub mod response;

pub use handler::{predict_handler, PredictParams};
pub use response::PredictResponse;
