// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Resolution order: built-in defaults, then an optional TOML file, then
//! `HWR_*` environment variables. Command-line flags are applied last by
//! the binaries.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vision::TrOcrVariant;

/// Maximum upload size (16MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Extensions accepted for uploads
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// OCR backend selected at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    EasyOcr,
    TrOcr,
    Mock,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easyocr" => Ok(Backend::EasyOcr),
            "trocr" => Ok(Backend::TrOcr),
            "mock" | "crnn" => Ok(Backend::Mock),
            _ => Err(ConfigError::InvalidValue {
                key: "backend".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::EasyOcr => write!(f, "easyocr"),
            Backend::TrOcr => write!(f, "trocr"),
            Backend::Mock => write!(f, "mock"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub backend: Backend,
    /// Base URL of the EasyOCR sidecar
    pub easyocr_url: String,
    /// Base URL of the TrOCR sidecar
    pub trocr_url: String,
    pub trocr_variant: TrOcrVariant,
    /// Languages passed to EasyOCR
    pub languages: Vec<String>,
    pub request_timeout_secs: u64,
}

impl EngineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            easyocr_url: "http://127.0.0.1:8090".to_string(),
            trocr_url: "http://127.0.0.1:8091".to_string(),
            trocr_variant: TrOcrVariant::default(),
            languages: vec!["en".to_string()],
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("static/uploads"),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached predictions; 0 disables the cache
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub upload: UploadConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Defaults or `path`, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `HWR_*` overrides looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("HWR_LISTEN_ADDR") {
            self.server.listen_addr = val;
        }

        if let Some(val) = lookup("HWR_BACKEND") {
            self.engine.backend = val.parse()?;
        }

        if let Some(val) = lookup("HWR_EASYOCR_URL") {
            self.engine.easyocr_url = val;
        }

        if let Some(val) = lookup("HWR_TROCR_URL") {
            self.engine.trocr_url = val;
        }

        if let Some(val) = lookup("HWR_TROCR_VARIANT") {
            self.engine.trocr_variant = val.parse().unwrap_or_default();
        }

        if let Some(val) = lookup("HWR_LANGUAGES") {
            self.engine.languages = val
                .split(',')
                .map(|lang| lang.trim().to_string())
                .filter(|lang| !lang.is_empty())
                .collect();
        }

        if let Some(val) = lookup("HWR_ENGINE_TIMEOUT_SECS") {
            self.engine.request_timeout_secs = parse_number("HWR_ENGINE_TIMEOUT_SECS", &val)?;
        }

        if let Some(val) = lookup("HWR_UPLOAD_DIR") {
            self.upload.dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("HWR_MAX_UPLOAD_BYTES") {
            self.upload.max_bytes = parse_number("HWR_MAX_UPLOAD_BYTES", &val)?;
        }

        if let Some(val) = lookup("HWR_CACHE_CAPACITY") {
            self.cache.capacity = parse_number("HWR_CACHE_CAPACITY", &val)?;
        }

        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
