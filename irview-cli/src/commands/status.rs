//! Status command - connectivity of one camera index

use anyhow::Result;
use clap::Args;
use irview_core::ConfigFile;

use super::open_engine;

/// Arguments for the status command
#[derive(Args)]
pub struct StatusArgs {
    /// Camera index (defaults to the configured device)
    index: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

/// Show whether a camera index is connected
pub async fn status(args: StatusArgs, config: &ConfigFile) -> Result<()> {
    let index = args.index.unwrap_or(config.capture.device);
    let engine = open_engine(config)?;
    let status = engine.device_status(index);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("irview - Camera {}\n", index);
    println!("  Connected:  {}", status.connected);
    println!("  Available:  {}", status.available);
    println!("  Devices:    {}", status.device_count);
    if let Some(name) = &status.name {
        println!("  Name:       {}", name);
    }
    if let Some(error) = &status.error {
        println!("  Error:      {}", error);
    }

    Ok(())
}
