//! Format negotiation
//!
//! Transient capability discovery (`list_resolutions`) and the activation
//! path that produces a BGRA reader for a new session (`negotiate`).

use std::collections::HashSet;

use tracing::{debug, info};

use crate::catalog;
use crate::error::{IrviewError, Result};
use crate::platform::{MajorType, MediaType, Platform, ReaderConfig, SourceReader};
use crate::types::FormatCandidate;

/// A reader ready for the acquisition loop
pub struct NegotiatedReader {
    /// The stream reader; owns the activated device
    pub reader: Box<dyn SourceReader>,
    /// Width reported by the reader
    pub width: u32,
    /// Height reported by the reader
    pub height: u32,
}

impl std::fmt::Debug for NegotiatedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NegotiatedReader")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Reduce declared media types to unique video resolutions
///
/// Declaration order is kept and the first rate seen for a size wins. A
/// zero rate denominator yields `fallback_rate`.
pub fn candidates_from(types: &[MediaType], fallback_rate: u32) -> Vec<FormatCandidate> {
    let mut seen = HashSet::new();
    types
        .iter()
        .filter(|t| t.major == MajorType::Video)
        .filter(|t| t.width > 0 && t.height > 0)
        .filter(|t| seen.insert((t.width, t.height)))
        .map(|t| FormatCandidate {
            width: t.width,
            height: t.height,
            frame_rate_hz: t.frame_rate.whole().unwrap_or(fallback_rate),
        })
        .collect()
}

/// Resolutions declared by device `index`
///
/// The device is activated only for the duration of the call and released
/// before returning. An open session on the same device is not touched.
pub fn list_resolutions(
    platform: &dyn Platform,
    index: usize,
    fallback_rate: u32,
) -> Result<Vec<FormatCandidate>> {
    let entry = catalog::resolve(platform, index)?;
    let mut source = platform.activate(&entry)?;
    let types = source.native_media_types()?;
    drop(source);

    let candidates = candidates_from(&types, fallback_rate);
    debug!(
        "Device {} declares {} media type(s), {} unique resolution(s)",
        index,
        types.len(),
        candidates.len()
    );
    Ok(candidates)
}

/// Activate device `index` and negotiate a BGRA stream reader
///
/// Every failure is reported as [`IrviewError::OpenDevice`].
pub fn negotiate(
    platform: &dyn Platform,
    index: usize,
    config: &ReaderConfig,
) -> Result<NegotiatedReader> {
    let entry = catalog::resolve(platform, index)?;
    debug!("Negotiating {:?} output on {}", config.output, entry.id);

    let source = platform.activate(&entry).map_err(as_open_error)?;
    let reader = source.into_reader(config).map_err(as_open_error)?;
    let (width, height) = reader.frame_size().map_err(as_open_error)?;

    if width == 0 || height == 0 {
        return Err(IrviewError::open_device(format!(
            "{} negotiated an empty frame size {}x{}",
            entry.id, width, height
        )));
    }

    info!(
        "Device {} ({}) negotiated at {}x{}",
        index,
        entry.name.as_deref().unwrap_or("unnamed"),
        width,
        height
    );
    Ok(NegotiatedReader {
        reader,
        width,
        height,
    })
}

fn as_open_error(e: IrviewError) -> IrviewError {
    match e.root() {
        IrviewError::OpenDevice(_) => e,
        _ => IrviewError::open_device(e.to_string()),
    }
}
