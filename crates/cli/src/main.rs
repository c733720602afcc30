//! Embody CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Run the Body on the simulated environment
//! - `send`    — Push one action to a running Body
//! - `watch`   — Print percepts from a running Body
//! - `config`  — Print the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "embody",
    about = "Embody — perception-action runtime for a split embodied agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (default: $EMBODY_CONFIG or ~/.embody/config.toml)
    #[arg(short, long, global = true, env = "EMBODY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Body until Ctrl-C or disconnect
    Run,

    /// Send one action to a running Body
    Send {
        /// Action tag (flee, eat, idle, explore)
        action: String,

        /// Free-form reason attached to the command
        #[arg(short, long)]
        reason: Option<String>,

        /// Override the command endpoint
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Print percepts from a running Body
    Watch {
        /// Stop after this many frames
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Override the percept endpoint
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run => commands::run::run(config_path).await?,
        Commands::Send {
            action,
            reason,
            endpoint,
        } => commands::send::run(config_path, &action, reason, endpoint).await?,
        Commands::Watch { count, endpoint } => {
            commands::watch::run(config_path, count, endpoint).await?
        }
        Commands::Config => commands::config_cmd::show(config_path).await?,
    }

    Ok(())
}
