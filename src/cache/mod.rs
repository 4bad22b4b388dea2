// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Content-addressed prediction cache
//!
//! Keys are the hex SHA-256 of the uploaded bytes, so re-uploading the same
//! image under any name is answered without running OCR again.

use std::num::NonZeroUsize;

use lru::LruCache;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

pub struct PredictionCache {
    entries: Option<Mutex<LruCache<String, String>>>,
}

impl PredictionCache {
    /// Create a cache holding at most `capacity` predictions (0 disables it)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Hex SHA-256 of `bytes`
    pub fn hash_bytes(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub async fn get(&self, hash: &str) -> Option<String> {
        let entries = self.entries.as_ref()?;
        let hit = entries.lock().await.get(hash).cloned();
        debug!(
            "Prediction cache {} for {}",
            if hit.is_some() { "hit" } else { "miss" },
            hash
        );
        hit
    }

    pub async fn insert(&self, hash: String, text: String) {
        if let Some(entries) = &self.entries {
            entries.lock().await.put(hash, text);
        }
    }

    pub async fn len(&self) -> usize {
        match &self.entries {
            Some(entries) => entries.lock().await.len(),
            None => 0,
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every entry, returning how many were removed
    pub async fn clear(&self) -> usize {
        match &self.entries {
            Some(entries) => {
                let mut entries = entries.lock().await;
                let removed = entries.len();
                entries.clear();
                removed
            }
            None => 0,
        }
    }
}
