//! List command

use anyhow::Result;
use irview_core::ConfigFile;

use super::{open_engine, report};

/// List attached cameras
pub async fn list(config: &ConfigFile) -> Result<()> {
    println!("irview - Attached Cameras\n");

    let engine = open_engine(config)?;
    let devices = engine
        .enumerate_devices()
        .map_err(|e| report(e, "Failed to enumerate cameras"))?;

    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("{:<7} {}", "Index", "Name");
    println!("{}", "-".repeat(40));
    for device in devices {
        println!("{:<7} {}", device.index, device.name);
    }

    println!("\nUse 'irview formats <index>' to see supported resolutions.");
    Ok(())
}
