// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload validation and storage

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::vision::TempFileGuard;

/// True when `filename` has an extension listed in `allowed` (case-insensitive)
pub fn allowed_file(filename: &str, allowed: &[String]) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => {
            let ext = ext.to_lowercase();
            allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext))
        }
        _ => false,
    }
}

/// Reduce a client-supplied filename to a safe single path component
pub fn secure_filename(filename: &str) -> String {
    // Only the final component counts
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches(['.', '_']);
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Write an upload under `dir` as `<millis>_<secure name>`
///
/// The returned guard deletes the file when dropped.
pub async fn save_upload(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<TempFileGuard> {
    tokio::fs::create_dir_all(dir).await?;

    let name = format!(
        "{}_{}",
        chrono::Utc::now().timestamp_millis(),
        secure_filename(filename)
    );
    write_upload(dir.join(name), bytes).await
}

async fn write_upload(path: PathBuf, bytes: &[u8]) -> std::io::Result<TempFileGuard> {
    // Guard first: a failed or abandoned write must not leave a partial file
    let guard = TempFileGuard::new(path);
    tokio::fs::write(guard.path(), bytes).await?;
    debug!("Saved upload to {} ({} bytes)", guard.path().display(), bytes.len());

    Ok(guard)
}
