//! ideagen - subscription-gated business idea generator for the terminal

mod app;
mod commands;
mod markdown;
mod tui;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ideagen_core::Config;

#[derive(Parser)]
#[command(name = "ideagen", version, about = "Stream AI business ideas to your terminal")]
struct Cli {
    /// Config file (default: ~/.ideagen/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Idea stream endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Session file written by the sign-in flow
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the idea page (default)
    Watch,
    /// Show whether the signed-in profile has access, and why
    Access,
    /// Verify a subscription webhook delivery and print the resulting update
    Webhook {
        /// File holding the raw request body
        #[arg(long)]
        body: PathBuf,
        /// svix-id header
        #[arg(long)]
        id: String,
        /// svix-timestamp header
        #[arg(long)]
        timestamp: String,
        /// svix-signature header
        #[arg(long)]
        signature: String,
        /// Write the update to the user's profile metadata
        #[arg(long)]
        apply: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(path) = cli.session_file {
        config.session_file = Some(path);
    }

    init_logging(&config)?;
    tracing::info!("ideagen {} starting", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => app::run(&config).await,
        Command::Access => commands::access(&config).await,
        Command::Webhook {
            body,
            id,
            timestamp,
            signature,
            apply,
        } => {
            let delivery = commands::Delivery {
                body,
                id,
                timestamp,
                signature,
            };
            commands::webhook(&delivery, apply).await
        }
    }
}

/// Log to a file; the terminal belongs to the UI
fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}
