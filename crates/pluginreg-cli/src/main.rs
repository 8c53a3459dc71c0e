//! pluginreg CLI.
//!
//! Installs plugins from GitHub releases or local directories and archives
//! into a plugin directory.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pluginreg_telemetry::LogFormat;

mod commands;
mod config_bridge;

/// pluginreg - plugin installer
#[derive(Parser)]
#[command(name = "pluginreg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file, merged over the user config
    #[arg(short, long, global = true, env = "PLUGINREG_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format: pretty, compact or json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a plugin from a GitHub release URL or a local path
    Install {
        /// `github.com/<owner>/<repo>[@<version>]`, a directory, or an archive
        source: String,

        /// Directory to install into (defaults to the configured plugin dir)
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },

    /// Show how a plugin URL is interpreted
    Resolve {
        /// Plugin URL
        url: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = pluginreg_config::Config::load(cli.config.as_deref())
        .context("failed to load configuration")?
        .config;

    let mut log_config = config_bridge::to_log_config(&config);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    if let Err(e) = pluginreg_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Install { source, dest } => {
            commands::install::run(&config, &source, dest).await?;
        },
        Commands::Resolve { url, json } => {
            commands::resolve::run(&config, &url, json)?;
        },
    }

    Ok(())
}
