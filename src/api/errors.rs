// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// JSON body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file part in the request")]
    MissingFile,

    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file type. Allowed types: {allowed}")]
    InvalidFileType { allowed: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to save uploaded file: {0}")]
    SaveFailed(String),

    #[error("Error processing image: {0}")]
    Processing(String),
}

impl ApiError {
    pub fn invalid_file_type(allowed: &[String]) -> Self {
        ApiError::InvalidFileType {
            allowed: allowed.join(", "),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFile
            | ApiError::NoFileSelected
            | ApiError::InvalidFileType { .. }
            | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::SaveFailed(_) | ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            error: self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        (status, Json(self.to_response())).into_response()
    }
}
