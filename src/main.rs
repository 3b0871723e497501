//! Signal Options - Main Entry Point
//!
//! Offline tooling around the signal pipeline: checks webhook payloads the
//! way the trader would and prints the effective configuration. The broker
//! client plugs into the library through its traits.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use signal_options::config::load_config;
use signal_options::intent::validate_payload;

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a webhook payload and print the resulting trade intent
    Validate {
        /// JSON file to read; stdin when omitted
        path: Option<PathBuf>,
    },
    /// Print the effective configuration (secrets omitted)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = load_config(Some(&args.config))?;

    // Initialize logging
    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.settings.log_level.clone());
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Configuration file: {}", args.config);

    match args.command {
        Command::Validate { path } => {
            let body = match &path {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut body = String::new();
                    std::io::stdin().read_to_string(&mut body)?;
                    body
                }
            };
            let payload: serde_json::Value =
                serde_json::from_str(&body).context("payload is not JSON")?;

            match validate_payload(&payload) {
                Ok(intent) => {
                    info!(
                        ticker = %intent.ticker,
                        direction = %intent.direction,
                        "Payload accepted"
                    );
                    println!("{}", serde_json::to_string_pretty(&intent)?);
                }
                Err(e) => {
                    error!(issues = e.issues.len(), "Payload rejected");
                    println!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
