//! Formats command - resolutions a camera declares

use anyhow::Result;
use clap::Args;
use irview_core::ConfigFile;

use super::open_engine;

/// Arguments for the formats command
#[derive(Args)]
pub struct FormatsArgs {
    /// Camera index (defaults to the configured device)
    index: Option<usize>,
}

/// List the resolutions a camera declares
pub async fn formats(args: FormatsArgs, config: &ConfigFile) -> Result<()> {
    let index = args.index.unwrap_or(config.capture.device);
    let engine = open_engine(config)?;
    let resolutions = engine.supported_resolutions(index);

    println!("irview - Camera {} Resolutions\n", index);
    if resolutions.is_empty() {
        println!("No resolutions reported.");
        println!("\nRun with -v to see why, or check 'irview status {}'.", index);
        return Ok(());
    }

    println!("{:<12} {}", "Resolution", "Frame rate");
    println!("{}", "-".repeat(25));
    for candidate in resolutions {
        println!(
            "{:<12} {} fps",
            format!("{}x{}", candidate.width, candidate.height),
            candidate.frame_rate_hz
        );
    }

    Ok(())
}
