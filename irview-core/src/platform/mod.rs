//! Platform capture layer
//!
//! The engine talks to hardware through three seams:
//! - [`Platform`]: the device registry (enumeration and activation)
//! - [`MediaSource`]: an activated device, queried for its native media types
//!   and turned into a reader
//! - [`SourceReader`]: a negotiated stream producing decoded BGRA samples
//!
//! Ownership follows the hardware: a reader owns the device it was created
//! from, so dropping the reader releases both handles.

#[cfg(all(target_os = "linux", feature = "v4l2"))]
pub mod v4l2;

#[cfg(all(target_os = "linux", feature = "v4l2"))]
pub use v4l2::V4l2Platform;

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// One node reported by the device registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Backend-specific identifier (e.g. `/dev/video0`)
    pub id: String,
    /// Friendly name, `None` if it could not be read
    pub name: Option<String>,
}

impl DeviceEntry {
    /// Create an entry with a known name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    /// Create an entry whose identity could not be read
    pub fn unnamed(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Major type of a declared media type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MajorType {
    /// Video frames
    Video,
    /// Audio samples
    Audio,
    /// Metadata or anything else
    Other,
}

/// Frames-per-second ratio as declared by the device
///
/// A zero denominator means the rate is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ratio {
    /// Numerator
    pub numerator: u32,
    /// Denominator
    pub denominator: u32,
}

impl Ratio {
    /// Create a ratio
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Whole frames per second, `None` if the denominator is zero
    pub fn whole(&self) -> Option<u32> {
        self.numerator.checked_div(self.denominator)
    }
}

/// A native media type declared by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaType {
    /// Major type
    pub major: MajorType,
    /// Subtype fourcc
    pub subtype: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate in frames per second
    pub frame_rate: Ratio,
}

impl MediaType {
    /// Create a video media type
    pub fn video(subtype: u32, width: u32, height: u32, frame_rate: Ratio) -> Self {
        Self {
            major: MajorType::Video,
            subtype,
            width,
            height,
            frame_rate,
        }
    }
}

/// Decoded output layout requested from a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// 32-bit interleaved B, G, R, A/X
    #[default]
    Bgra32,
}

/// Settings handed to a source when it becomes a reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Output layout
    pub output: OutputFormat,
    /// Resolution hint; the reader's reported size is authoritative
    pub preferred_size: Option<(u32, u32)>,
    /// Poll timeout for a single read, `None` blocks indefinitely
    pub read_timeout: Option<Duration>,
    /// Number of driver buffers to queue
    pub buffer_count: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            output: OutputFormat::Bgra32,
            preferred_size: None,
            read_timeout: Some(Duration::from_millis(1000)),
            buffer_count: 4,
        }
    }
}

/// Device registry
pub trait Platform: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// List attached video capture devices in registry order
    fn enumerate(&self) -> Result<Vec<DeviceEntry>>;

    /// Activate a device returned by [`Platform::enumerate`]
    fn activate(&self, entry: &DeviceEntry) -> Result<Box<dyn MediaSource>>;
}

/// An activated device
///
/// Dropping the source releases the activation.
pub trait MediaSource: Send {
    /// Native media types in declaration order
    fn native_media_types(&mut self) -> Result<Vec<MediaType>>;

    /// Negotiate `config.output` and turn the source into a stream reader
    fn into_reader(self: Box<Self>, config: &ReaderConfig) -> Result<Box<dyn SourceReader>>;
}

/// A negotiated stream reader
pub trait SourceReader: Send {
    /// Negotiated frame size
    fn frame_size(&self) -> Result<(u32, u32)>;

    /// Block until the next sample
    ///
    /// `Ok(None)` means the read succeeded without delivering a sample.
    /// Any error ends the stream.
    fn read_sample(&mut self) -> Result<Option<Sample<'_>>>;
}

/// A delivered sample, possibly split over several planes
#[derive(Debug, Clone, Default)]
pub struct Sample<'a> {
    planes: Vec<Cow<'a, [u8]>>,
    pitch: Option<i32>,
    sequence: u64,
}

impl<'a> Sample<'a> {
    /// A sample with one plane
    pub fn single(data: impl Into<Cow<'a, [u8]>>) -> Self {
        Self {
            planes: vec![data.into()],
            pitch: None,
            sequence: 0,
        }
    }

    /// A sample made of several planes
    pub fn planar(planes: Vec<Cow<'a, [u8]>>) -> Self {
        Self {
            planes,
            pitch: None,
            sequence: 0,
        }
    }

    /// Attach a row pitch (negative for bottom-up scan order)
    pub fn with_pitch(mut self, pitch: i32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Attach the driver's sequence number
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Driver sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Collapse the planes into one contiguous region
    ///
    /// Single-plane samples are passed through without copying.
    pub fn into_contiguous(mut self) -> MediaBuffer<'a> {
        let data = match self.planes.len() {
            0 => Cow::Borrowed(&[][..]),
            1 => self.planes.swap_remove(0),
            _ => Cow::Owned(self.planes.concat()),
        };
        MediaBuffer {
            data,
            pitch: self.pitch,
        }
    }
}

/// A contiguous sample buffer
#[derive(Debug, Clone)]
pub struct MediaBuffer<'a> {
    data: Cow<'a, [u8]>,
    pitch: Option<i32>,
}

/// Stride-aware view of a buffer
#[derive(Debug, Clone, Copy)]
pub struct Scanlines<'b> {
    /// Rows in delivery order
    pub data: &'b [u8],
    /// Byte distance between rows; negative for bottom-up
    pub pitch: i32,
}

impl MediaBuffer<'_> {
    /// Stride-aware lock, `None` when the buffer carries no pitch
    pub fn lock_2d(&self) -> Option<Scanlines<'_>> {
        self.pitch.map(|pitch| Scanlines {
            data: &self.data,
            pitch,
        })
    }

    /// Flat lock
    pub fn lock(&self) -> &[u8] {
        &self.data
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The default platform for this build
pub fn default_platform() -> Result<Arc<dyn Platform>> {
    #[cfg(all(target_os = "linux", feature = "v4l2"))]
    {
        Ok(Arc::new(V4l2Platform::new()))
    }

    #[cfg(not(all(target_os = "linux", feature = "v4l2")))]
    {
        Err(crate::error::IrviewError::Unsupported(
            "no capture backend compiled in (enable the v4l2 feature on Linux)".to_string(),
        ))
    }
}
