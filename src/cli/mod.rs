// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod recognize;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::{AppConfig, Backend};

/// Options shared by the server and the CLI for locating configuration
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(long, env = "HWR_CONFIG")]
    pub config: Option<PathBuf>,

    /// OCR backend (easyocr, trocr, mock)
    #[arg(long)]
    pub backend: Option<Backend>,
}

impl ConfigArgs {
    /// Load configuration, then apply flag overrides
    pub fn load(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(backend) = self.backend {
            config.engine.backend = backend;
        }
        Ok(config)
    }
}

/// Handwriting recognition server
#[derive(Parser, Debug)]
#[command(name = "handwriting-ocr-node")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "HTTP service for handwriting recognition", long_about = None)]
pub struct ServeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Address to listen on (overrides server.listen_addr)
    #[arg(long)]
    pub listen: Option<String>,
}

impl ServeArgs {
    pub fn load(&self) -> Result<AppConfig> {
        let mut config = self.config.load()?;
        if let Some(listen) = &self.listen {
            config.server.listen_addr = listen.clone();
        }
        Ok(config)
    }
}

/// Handwriting recognition CLI
#[derive(Parser, Debug)]
#[command(name = "handwriting-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Recognize handwriting in local image files", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recognize a single image
    Recognize(recognize::RecognizeArgs),

    /// Recognize every supported image in a directory
    Batch(recognize::BatchArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.config.load()?;
    match cli.command {
        Commands::Recognize(args) => recognize::recognize(&config, args).await,
        Commands::Batch(args) => recognize::batch(&config, args).await,
    }
}
