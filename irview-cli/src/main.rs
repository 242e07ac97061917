//! irview CLI
//!
//! Camera preview and still capture from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # List attached cameras
//! irview list
//!
//! # Run a 10 second preview on the second camera
//! irview preview 1 --seconds 10
//!
//! # Save one raw BGRA frame
//! irview snapshot --output frame.bgra
//! ```

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use irview_core::ConfigFile;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// irview - camera preview and still capture
#[derive(Parser)]
#[command(name = "irview")]
#[command(version)]
#[command(about = "Camera preview and still capture", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file to use instead of ~/.config/irview/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached cameras
    #[command(alias = "ls")]
    List,

    /// Show whether a camera index is connected
    Status(commands::StatusArgs),

    /// List the resolutions a camera declares
    Formats(commands::FormatsArgs),

    /// Run a preview session and report acquisition statistics
    Preview(commands::PreviewArgs),

    /// Capture one raw BGRA frame to a file
    Snapshot(commands::SnapshotArgs),

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("irview_core={}", level).parse()?)
                .add_directive(format!("irview={}", level).parse()?),
        )
        .with_target(false)
        .init();

    // The config command must work even when the file does not parse
    if let Commands::Config(args) = cli.command {
        return commands::config(args, cli.config).await;
    }

    let config = load_config(cli.config)?;
    match cli.command {
        Commands::List => commands::list(&config).await?,
        Commands::Status(args) => commands::status(args, &config).await?,
        Commands::Formats(args) => commands::formats(args, &config).await?,
        Commands::Preview(args) => commands::preview(args, &config).await?,
        Commands::Snapshot(args) => commands::snapshot(args, &config).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<ConfigFile> {
    match path {
        Some(path) => ConfigFile::load_from(path.clone())
            .with_context(|| format!("Failed to load {}", path.display())),
        None => Ok(ConfigFile::load_or_default()),
    }
}
