use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ruty_cli::transport;
use ruty_cli::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ruty")]
#[command(author, version, about = "Ruty - launcher core with an AI assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long, global = true)]
    backend: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a launcher query and print the results as JSON
    Resolve {
        /// Query text, e.g. "2+2", "/file notes" or "> hello"
        query: String,
    },

    /// Ask the assistant a single question
    Ask {
        /// Question to send
        message: String,
    },

    /// Check that the backend is reachable
    Health,

    /// Print the effective configuration
    Config,

    /// Drive the input pipeline with JSON lines on stdin
    Pipe,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "ruty_cli=debug,ruty=debug"
    } else {
        "ruty_cli=info,ruty=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };
    if let Some(url) = cli.backend {
        config.backend.base_url = url;
    }

    match cli.command {
        Commands::Resolve { query } => {
            transport::cli::run_resolve(&config, &query).await?;
        }
        Commands::Ask { message } => {
            transport::cli::run_ask(&config, &message).await?;
        }
        Commands::Health => {
            transport::cli::run_health(&config).await?;
        }
        Commands::Config => {
            transport::cli::run_config_show(&config)?;
        }
        Commands::Pipe => {
            tracing::info!("Starting pipe mode on stdio");
            transport::cli::run_pipe(&config).await?;
        }
    }

    Ok(())
}
