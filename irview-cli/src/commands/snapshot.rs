//! Snapshot command - capture one raw BGRA frame

use anyhow::{Context, Result, bail};
use clap::Args;
use irview_core::ConfigFile;
use std::path::PathBuf;
use std::time::Duration;

use super::{open_engine, report};

/// How long to wait for the first frame
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Arguments for the snapshot command
#[derive(Args)]
pub struct SnapshotArgs {
    /// Camera index (defaults to the configured device)
    index: Option<usize>,

    /// File to write the raw BGRA bytes to
    #[arg(short, long)]
    output: PathBuf,

    /// Time to let exposure settle after the first frame (milliseconds)
    #[arg(long, default_value = "500")]
    warmup_ms: u64,
}

/// Capture one frame
pub async fn snapshot(args: SnapshotArgs, config: &ConfigFile) -> Result<()> {
    let index = args.index.unwrap_or(config.capture.device);
    let engine = open_engine(config)?;
    let mut notices = engine.subscribe_frames();

    let session = tokio::task::block_in_place(|| engine.start_preview(index))
        .map_err(|e| report(e, "Failed to start capture"))?;

    let first_frame = async {
        while notices.changed().await.is_ok() {
            if notices.borrow_and_update().session == Some(session) {
                return true;
            }
        }
        false
    };
    let arrived = matches!(
        tokio::time::timeout(FIRST_FRAME_TIMEOUT, first_frame).await,
        Ok(true)
    );
    if !arrived {
        tokio::task::block_in_place(|| engine.close_device());
        bail!(
            "Camera {} delivered no frame within {} seconds",
            index,
            FIRST_FRAME_TIMEOUT.as_secs()
        );
    }

    tokio::time::sleep(Duration::from_millis(args.warmup_ms)).await;

    let photo = engine.capture_photo();
    tokio::task::block_in_place(|| engine.close_device());
    let photo = photo.map_err(|e| report(e, "Failed to capture frame"))?;

    std::fs::write(&args.output, &photo.data)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "{}x{} BGRA ({} bytes, stride {}) -> {}",
        photo.width,
        photo.height,
        photo.data.len(),
        photo.stride(),
        args.output.display()
    );
    Ok(())
}
