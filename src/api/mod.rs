// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod predict;
pub mod server;
pub mod upload;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{clear_cache_handler, health_handler, ClearCacheResponse, HealthResponse};
pub use predict::{predict_handler, PredictResponse};
pub use server::{create_router, serve, AppState};
pub use upload::{allowed_file, save_upload, secure_filename};
