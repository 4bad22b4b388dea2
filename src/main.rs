// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::{env, net::SocketAddr};

use anyhow::{Context, Result};
use clap::Parser;
use handwriting_ocr_node::{
    api::{serve, AppState},
    build_predictor,
    cli::ServeArgs,
    version, PredictionCache,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Handwriting OCR Node...\n");
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!("📅 Build Date: {}", version::BUILD_DATE);
    println!();
    tracing::info!(
        "{} features: {}",
        version::get_version_string(),
        version::FEATURES.join(", ")
    );

    let args = ServeArgs::parse();
    let config = args.load()?;

    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.server.listen_addr))?;

    tracing::info!(
        "Backend: {}, upload dir: {}, cache capacity: {}",
        config.engine.backend,
        config.upload.dir.display(),
        config.cache.capacity
    );

    let predictor = build_predictor(&config.engine).await?;
    if !predictor.is_loaded() {
        println!("⚠️  No OCR engine available, serving mock predictions");
    }

    let state = AppState::new(
        predictor,
        PredictionCache::new(config.cache.capacity),
        config.upload.clone(),
    );

    println!("✅ Listening on http://{}", addr);
    println!("\nPress Ctrl+C to shutdown...");

    serve(addr, state).await?;

    println!("👋 Shutdown complete");
    Ok(())
}
