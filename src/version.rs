// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the handwriting OCR node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-multi-strategy-ocr-2026-10-16";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2026-10-16";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "easyocr-sidecar",
    "trocr-sidecar",
    "multi-strategy-voting",
    "adaptive-binarization",
    "content-hash-cache",
    "mock-fallback",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Handwriting OCR Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
