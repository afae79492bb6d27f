//! dirflow CLI: offline utilities over the command pipeline.
//!
//! Commands:
//! - `validate` — Validate a command (or a list of commands) from JSON
//! - `context`  — Normalize a conversation context and check the new-chat hint
//! - `fallback` — Print the offline envelope for a message
//! - `config`   — Show, locate, validate or generate configuration
//! - `status`   — Show component limits and agents

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "dirflow",
    about = "dirflow: validate, prepare and inspect model-driven file commands",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a command object, or every entry of a JSON list
    Validate {
        /// JSON file to read, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },

    /// Prepare a conversation context blob
    Context {
        /// JSON file to read, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },

    /// Show the offline reply for a message
    Fallback {
        /// The user message
        message: String,

        /// Treat the reply as an error envelope for this error text
        #[arg(short, long)]
        error: Option<String>,

        /// Reason recorded on a fallback envelope
        #[arg(short, long, default_value = "offline mode")]
        reason: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show component status
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
    /// Validate the configuration
    Validate,
    /// Print a starter config file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate { input } => commands::validate::run(&input).await?,
        Commands::Context { input } => commands::context::run(&input).await?,
        Commands::Fallback {
            message,
            error,
            reason,
        } => commands::fallback::run(&message, error.as_deref(), &reason).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Init => commands::config_cmd::init().await?,
        },
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
