//! CLI command implementations

mod config;
mod formats;
mod list;
mod preview;
mod snapshot;
mod status;

pub use config::{ConfigArgs, config};
pub use formats::{FormatsArgs, formats};
pub use list::list;
pub use preview::{PreviewArgs, preview};
pub use snapshot::{SnapshotArgs, snapshot};
pub use status::{StatusArgs, status};

use anyhow::{Context, Result};
use irview_core::{ConfigFile, Engine, IrviewError};

/// Build an engine from the loaded configuration
fn open_engine(config: &ConfigFile) -> Result<Engine> {
    let engine_config = config
        .engine_config()
        .context("Invalid capture settings")?;
    Engine::with_default_platform(engine_config).context("No capture backend available")
}

/// Turn an engine error into a CLI error, printing its hint first
fn report(err: IrviewError, what: &str) -> anyhow::Error {
    if let Some(hint) = err.user_hint() {
        eprintln!("Hint: {}", hint);
    }
    anyhow::Error::new(err).context(what.to_string())
}
