//! Config command - inspect and create the configuration file

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use irview_core::config::{ConfigFile, sample_config};
use std::path::{Path, PathBuf};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the effective capture and preview settings
    Show {
        /// Print the file as written instead of the resolved settings
        #[arg(long)]
        raw: bool,
    },

    /// Write a config file, optionally seeding the capture settings
    Init(InitArgs),

    /// Print the commented sample configuration to stdout
    Sample,
}

/// Seed values for `config init`
#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,

    /// Default device index
    #[arg(long)]
    pub device: Option<usize>,

    /// Preferred resolution as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Driver buffers per session
    #[arg(long)]
    pub buffers: Option<u32>,

    /// Preview pull rate
    #[arg(long)]
    pub fps: Option<u32>,
}

impl InitArgs {
    fn seeds_anything(&self) -> bool {
        self.device.is_some() || self.size.is_some() || self.buffers.is_some() || self.fps.is_some()
    }

    fn apply(&self, file: &mut ConfigFile) {
        if let Some(device) = self.device {
            file.capture.device = device;
        }
        if let Some((width, height)) = self.size {
            file.capture.width = width;
            file.capture.height = height;
        }
        if let Some(buffers) = self.buffers {
            file.capture.buffer_count = buffers;
        }
        if let Some(fps) = self.fps {
            file.preview.fps = fps;
        }
    }
}

fn parse_size(value: &str) -> std::result::Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width = width.parse().map_err(|_| format!("bad width '{}'", width))?;
    let height = height.parse().map_err(|_| format!("bad height '{}'", height))?;
    Ok((width, height))
}

/// Run config subcommand
///
/// `custom` is the `--config` path, if one was given.
pub async fn config(args: ConfigArgs, custom: Option<PathBuf>) -> Result<()> {
    let path = custom.unwrap_or_else(ConfigFile::default_path);

    match args.command {
        ConfigCommand::Path => {
            let state = if path.exists() { "exists" } else { "not created yet" };
            println!("{} ({})", path.display(), state);
        }
        ConfigCommand::Show { raw: true } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            print!("{}", content);
        }
        ConfigCommand::Show { raw: false } => show(&path)?,
        ConfigCommand::Init(init) => {
            if path.exists() && !init.force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }

            if init.seeds_anything() {
                let mut file = ConfigFile::default();
                init.apply(&mut file);
                file.engine_config().context("Seeded settings are invalid")?;
                file.save_to(path.clone())?;
            } else {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).context("Failed to create config directory")?;
                }
                std::fs::write(&path, sample_config()).context("Failed to write config file")?;
            }

            println!("Wrote {}", path.display());
        }
        ConfigCommand::Sample => print!("{}", sample_config()),
    }

    Ok(())
}

fn show(path: &Path) -> Result<()> {
    let file = ConfigFile::load_from(path.to_path_buf()).context("Config file is invalid")?;
    let source = if path.exists() { "file" } else { "defaults" };
    let capture = &file.capture;

    println!("Settings from {} ({})", path.display(), source);
    println!();
    println!("[capture]");
    println!("  device              {}", capture.device);
    match (capture.width, capture.height) {
        (0, 0) => println!("  resolution          device default"),
        (w, h) => println!("  resolution          {}x{}", w, h),
    }
    match capture.read_timeout_ms {
        0 => println!("  read timeout        none (blocking reads)"),
        ms => println!("  read timeout        {} ms", ms),
    }
    println!("  driver buffers      {}", capture.buffer_count);
    println!("  fallback rate       {} fps", capture.fallback_frame_rate);
    println!("[preview]");
    println!("  pull rate           {} fps", file.preview.fps);

    // Surface mistakes before a capture command trips over them
    match file.engine_config() {
        Ok(engine) => {
            for warning in engine.validate() {
                println!("\nWarning: {}", warning);
            }
        }
        Err(e) => println!("\nError: {}", e),
    }
    Ok(())
}
