//! Kai CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP chat backend
//! - `chat`: Talk to Kai, one message or an interactive session
//! - `config`: Print the effective or default configuration
//! - `doctor`: Diagnose configuration and upstream reachability

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "kai",
    about = "Kai: wellbeing chat backend",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of ~/.kai/config.toml
    #[arg(short, long, global = true, env = "KAI_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP chat backend
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat from the terminal (interactive unless -m is given)
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Print the effective configuration (secrets redacted)
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        default: bool,
    },

    /// Diagnose configuration and upstream reachability
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port } => commands::serve::run(config_path, host, port).await?,
        Commands::Chat { message } => commands::chat::run(config_path, message).await?,
        Commands::Config { default } => commands::config_cmd::run(config_path, default)?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
