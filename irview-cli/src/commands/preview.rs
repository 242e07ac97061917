//! Preview command - run a session and pull frames at a render cadence

use anyhow::Result;
use clap::Args;
use irview_core::{ConfigFile, SessionState};
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{info, warn};

use super::{open_engine, report};

/// Arguments for the preview command
#[derive(Args)]
pub struct PreviewArgs {
    /// Camera index (defaults to the configured device)
    index: Option<usize>,

    /// Stop after this many seconds (0 = run until Ctrl+C)
    #[arg(short, long, default_value = "0")]
    seconds: u64,

    /// Renderer pull rate (defaults to the configured preview fps)
    #[arg(long)]
    fps: Option<u32>,
}

#[derive(Default)]
struct PullCounters {
    pulls: u64,
    fresh: u64,
    empty: u64,
    last_generation: u64,
}

/// Run a preview session
pub async fn preview(args: PreviewArgs, config: &ConfigFile) -> Result<()> {
    let index = args.index.unwrap_or(config.capture.device);
    let fps = args.fps.unwrap_or(config.preview.fps).max(1);

    println!("irview - Preview\n");

    let engine = open_engine(config)?;
    let session = tokio::task::block_in_place(|| engine.start_preview(index))
        .map_err(|e| report(e, "Failed to start preview"))?;
    let (width, height) = engine
        .stats()
        .map(|s| (s.width, s.height))
        .unwrap_or_default();

    println!("Preview started on camera {}", index);
    println!("  Session:    {}", session);
    println!("  Resolution: {}x{}", width, height);
    println!("  Pull rate:  {} fps", fps);
    println!();
    println!("Press Ctrl+C to stop...\n");

    let started = Instant::now();
    let deadline = (args.seconds > 0).then(|| Duration::from_secs(args.seconds));
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
    let mut counters = PullCounters::default();

    let render = async {
        loop {
            ticker.tick().await;
            if deadline.is_some_and(|d| started.elapsed() >= d) {
                break;
            }
            if engine.state() == SessionState::Closed {
                warn!("Acquisition ended before the preview was stopped");
                break;
            }

            counters.pulls += 1;
            match engine.fetch_frame(session, width, height) {
                Some(frame) if frame.generation != counters.last_generation => {
                    counters.fresh += 1;
                    counters.last_generation = frame.generation;
                }
                Some(_) => {}
                None => counters.empty += 1,
            }
        }
    };

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            println!("\nReceived interrupt signal...");
        }
        _ = render => {
            info!("Render loop ended");
        }
    }

    let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
    let stats = engine.stats();

    println!("Stopping preview...");
    tokio::task::block_in_place(|| engine.close_device());

    println!("\nPreview statistics:");
    println!("  Duration:        {:.1} s", elapsed);
    println!("  Renderer pulls:  {}", counters.pulls);
    println!("  New frames seen: {}", counters.fresh);
    println!("  Empty pulls:     {}", counters.empty);
    if let Some(stats) = stats {
        println!("  Frames acquired: {}", stats.frames_acquired);
        println!("  Frames skipped:  {}", stats.frames_skipped);
        println!(
            "  Acquisition:     {:.1} fps",
            stats.frames_acquired as f64 / elapsed
        );
    }

    Ok(())
}
