//! Main entry point for ePub Translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epub_translator::cli::commands::{self, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", env!("CARGO_CRATE_NAME"), log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    commands::handle_translate(args).await
}
