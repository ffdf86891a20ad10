//! CLI argument definitions and handlers

use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::TranslatorConfig;

/// ePub Translator - translate e-books with the DeepL document API
#[derive(Parser, Debug)]
#[command(name = "epub-translator", version, about, long_about = None)]
pub struct Args {
    /// Input ePub file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output ePub file
    #[arg(short, long)]
    pub output: PathBuf,

    /// DeepL auth key (defaults to DEEPL_AUTH_KEY)
    #[arg(short = 'k', long)]
    pub auth_key: Option<String>,

    /// Source language (default: EN)
    #[arg(short, long)]
    pub source_lang: Option<String>,

    /// Target language (default: ZH)
    #[arg(short = 'd', long)]
    pub target_lang: Option<String>,

    /// Configuration file (JSON, TOML, YAML...)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long)]
    pub api_endpoint: Option<String>,

    /// Seconds between two status checks
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Status checks before giving up on a document
    #[arg(long)]
    pub max_poll_attempts: Option<u32>,

    /// Directory for the temporary working directory
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Merge command line overrides on top of file and environment configuration
    pub fn resolve_config(&self) -> anyhow::Result<TranslatorConfig> {
        let mut config = TranslatorConfig::load(self.config.as_deref())?;

        if let Some(key) = &self.auth_key {
            config.auth_key = key.clone();
        }
        if let Some(lang) = &self.source_lang {
            config.source_lang = lang.clone();
        }
        if let Some(lang) = &self.target_lang {
            config.target_lang = lang.clone();
        }
        if let Some(endpoint) = &self.api_endpoint {
            config.api_endpoint = endpoint.clone();
        }
        if let Some(secs) = self.poll_interval_secs {
            config.poll_interval_ms = secs.saturating_mul(1000);
        }
        if let Some(attempts) = self.max_poll_attempts {
            config.max_poll_attempts = attempts;
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir = Some(dir.clone());
        }

        Ok(config)
    }
}

/// Handle the translation command
pub async fn handle_translate(args: Args) -> anyhow::Result<()> {
    use crate::processors::epub::EpubProcessor;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Instant;
    use tracing::info;

    let config = args.resolve_config()?;
    if config.auth_key.is_empty() {
        Args::command()
            .error(
                clap::error::ErrorKind::MissingRequiredArgument,
                "an auth key is required: pass --auth-key or set DEEPL_AUTH_KEY",
            )
            .exit();
    }

    let start_time = Instant::now();

    info!("Starting ePub translation");
    info!("Input: {}", args.input.display());
    info!("Output: {}", args.output.display());
    info!("Languages: {} -> {}", config.source_lang, config.target_lang);

    // Create progress bar
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let processor = EpubProcessor::from_config(Arc::new(config))?.with_progress(pb.clone());
    let report = processor.translate_epub(&args.input, &args.output).await?;

    pb.finish_with_message("Completed");

    for file in report.files.iter().filter(|f| !f.is_translated()) {
        eprintln!(
            "Kept original {} ({}): {}",
            file.path,
            file.status,
            file.error.as_deref().unwrap_or("unknown error")
        );
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, json).await?;
        info!("Report written to {}", path.display());
    }

    let duration = start_time.elapsed();
    println!("\n✅ ePub translation completed!");
    println!("   Output: {}", args.output.display());
    println!("   Translated: {}", report.translated());
    println!("   Failed: {}", report.failed());
    println!("   Time: {:?}", duration);

    Ok(())
}
