// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Args;
use tracing::{info, warn};

use crate::api::allowed_file;
use crate::config::AppConfig;
use crate::vision::{build_predictor, Recognition};

/// Arguments for the recognize command
#[derive(Args, Debug)]
pub struct RecognizeArgs {
    /// Image file to recognize
    pub path: PathBuf,

    /// Print every strategy's candidate
    #[arg(long)]
    pub trace: bool,
}

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Directory of images
    pub dir: PathBuf,

    /// Print every strategy's candidate for each image
    #[arg(long)]
    pub trace: bool,
}

pub async fn recognize(config: &AppConfig, args: RecognizeArgs) -> Result<()> {
    let predictor = build_predictor(&config.engine).await?;
    info!("Using {} predictor", predictor.name());

    let recognition = predictor.predict(&args.path).await?;
    if args.trace {
        print_trace(&recognition);
    }
    println!("{}", recognition.text);

    Ok(())
}

pub async fn batch(config: &AppConfig, args: BatchArgs) -> Result<()> {
    let images = list_images(&args.dir, &config.upload.allowed_extensions)?;
    if images.is_empty() {
        return Err(anyhow!("No supported images found in {}", args.dir.display()));
    }

    let predictor = build_predictor(&config.engine).await?;
    info!(
        "Recognizing {} images with {} predictor",
        images.len(),
        predictor.name()
    );

    let results = predictor.predict_batch(&images).await;
    let mut failures = 0;
    for (path, result) in images.iter().zip(results) {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        match result {
            Ok(recognition) => {
                println!("{}: {}", name, recognition.text);
                if args.trace {
                    print_trace(&recognition);
                }
            }
            Err(e) => {
                warn!("Failed to recognize {}: {}", name, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} images failed", failures, images.len()));
    }
    Ok(())
}

/// Supported images directly inside `dir`, sorted by name
pub fn list_images(dir: &Path, allowed_extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| allowed_file(n, allowed_extensions))
                .unwrap_or(false);
        if is_image {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn print_trace(recognition: &Recognition) {
    for candidate in &recognition.trace {
        println!(
            "[{}] avg_conf={:.3} items={} text={:?}",
            candidate.strategy, candidate.mean_confidence, candidate.items, candidate.text
        );
    }
}
