//! x431 CLI - Command-line tool for x431 remote diagnostic sessions
//!
//! Logs in to the remote diagnostic service and opens device sessions.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use x431_client::X431Client;

use crate::config::{ArgOverrides, Config};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "x431")]
#[command(author, version, about = "x431 Remote Diagnostic CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "X431_CONFIG")]
    config: Option<PathBuf>,

    /// Account name or number
    #[arg(short, long, env = "X431_USERNAME")]
    username: Option<String>,

    /// Account password
    #[arg(short, long, env = "X431_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// API base URL
    #[arg(long, env = "X431_API_URL")]
    api_url: Option<String>,

    /// Socket endpoint URL
    #[arg(long, env = "X431_SOCKET_URL")]
    socket_url: Option<String>,

    /// Socket connect timeout in milliseconds
    #[arg(long, value_name = "MS")]
    connect_timeout_ms: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and show the account record
    Login,

    /// Open a realtime session with a device
    Connect {
        /// Device serial number (12 characters)
        #[arg(env = "X431_SERIAL")]
        serial: Option<String>,
    },

    /// Print the default config file location
    ConfigPath,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load_or_default()
    };

    let serial_arg = match &cli.command {
        Commands::Connect { serial } => serial.as_deref(),
        _ => None,
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(&ArgOverrides {
        username: cli.username.as_deref(),
        password: cli.password.as_deref(),
        serial: serial_arg,
        api_url: cli.api_url.as_deref(),
        socket_url: cli.socket_url.as_deref(),
        connect_timeout_ms: cli.connect_timeout_ms,
    });

    let ctx = OutputContext::new(cli.output, cli.no_color, cli.quiet);

    let result = match &cli.command {
        Commands::Login => {
            let client = create_client(&merged)?;
            commands::login(&client, merged.credentials()?, &ctx).await
        }

        Commands::Connect { .. } => {
            let serial = merged
                .serial
                .clone()
                .context("No serial number given (argument, X431_SERIAL or config.toml)")?;
            let client = create_client(&merged)?;
            commands::connect(&client, merged.credentials()?, &serial, &ctx).await
        }

        Commands::ConfigPath => {
            println!("{}", Config::config_path()?.display());
            Ok(())
        }
    };

    if let Err(e) = &result {
        ctx.error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

fn create_client(merged: &config::MergedConfig) -> Result<X431Client> {
    X431Client::with_config(merged.client.clone()).context("Failed to create x431 client")
}
