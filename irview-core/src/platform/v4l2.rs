//! Video4Linux2 capture backend
//!
//! Enumerates `/dev/video*` capture nodes, negotiates a 32-bit BGRA-class
//! format (falling back to YUYV with software conversion) and streams
//! frames through memory-mapped driver buffers.
//!
//! V4L2 has no process-wide subsystem to start; each reader owns its device
//! file descriptor and mmap arena, released on drop.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, trace, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::frameinterval::FrameIntervalEnum;
use v4l::framesize::FrameSizeEnum;
use v4l::io::mmap::Stream;
use v4l::io::traits::{CaptureStream, Stream as StreamTrait};
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use super::{
    DeviceEntry, MediaSource, MediaType, OutputFormat, Platform, Ratio, ReaderConfig, Sample,
    SourceReader,
};
use crate::config::MAX_READ_TIMEOUT_MS;
use crate::error::{IrviewError, Result};
use crate::formats::{self, codes, SourceLayout};

/// Formats requested from the driver, most preferred first
const NEGOTIATION_ORDER: [u32; 4] = [codes::XR24, codes::AR24, codes::BGR4, codes::YUYV];

/// Directory holding the video4linux device nodes
const DEV_DIR: &str = "/dev";

/// V4L2 device registry
#[derive(Debug)]
pub struct V4l2Platform {
    dev_dir: PathBuf,
}

impl V4l2Platform {
    /// Create the registry over `/dev`
    pub fn new() -> Self {
        Self::with_dev_dir(DEV_DIR)
    }

    /// Create the registry over another directory of device nodes
    pub fn with_dev_dir(dir: impl Into<PathBuf>) -> Self {
        let dev_dir = dir.into();
        info!("V4L2 backend scanning {:?}", dev_dir);
        Self { dev_dir }
    }

    /// `/dev/videoN` nodes sorted by N
    fn video_nodes(&self) -> io::Result<Vec<PathBuf>> {
        let mut nodes: Vec<(u32, PathBuf)> = std::fs::read_dir(&self.dev_dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let number = name.to_str()?.strip_prefix("video")?.parse::<u32>().ok()?;
                Some((number, entry.path()))
            })
            .collect();
        nodes.sort_by_key(|(number, _)| *number);
        Ok(nodes.into_iter().map(|(_, path)| path).collect())
    }
}

impl Default for V4l2Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for V4l2Platform {
    fn name(&self) -> &str {
        "v4l2"
    }

    fn enumerate(&self) -> Result<Vec<DeviceEntry>> {
        let nodes = self.video_nodes().map_err(|e| {
            IrviewError::enumeration(format!("Failed to read {:?}: {}", self.dev_dir, e))
        })?;

        let mut entries = Vec::new();
        for path in nodes {
            let id = path.to_string_lossy().into_owned();
            match probe_node(&path) {
                Probe::Capture(name) => entries.push(DeviceEntry::new(id, name)),
                Probe::NotCapture => trace!("Skipping non-capture node {}", id),
                Probe::Unreadable(e) => {
                    // Busy or permission-denied nodes still count as attached
                    debug!("Cannot query {}: {}", id, e);
                    entries.push(DeviceEntry::unnamed(id));
                }
            }
        }

        debug!("V4L2 enumeration found {} device(s)", entries.len());
        Ok(entries)
    }

    fn activate(&self, entry: &DeviceEntry) -> Result<Box<dyn MediaSource>> {
        let device = Device::with_path(&entry.id).map_err(|e| {
            IrviewError::open_device(format!("Failed to open {}: {}", entry.id, e))
        })?;
        debug!("Activated {}", entry.id);
        Ok(Box::new(V4l2Source {
            path: entry.id.clone(),
            device,
        }))
    }
}

enum Probe {
    Capture(String),
    NotCapture,
    Unreadable(io::Error),
}

fn probe_node(path: &Path) -> Probe {
    let device = match Device::with_path(path) {
        Ok(device) => device,
        Err(e) => return Probe::Unreadable(e),
    };
    let caps = match device.query_caps() {
        Ok(caps) => caps,
        Err(e) => return Probe::Unreadable(e),
    };
    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        return Probe::NotCapture;
    }
    // UVC exposes metadata nodes that share the capture capability but
    // list no image formats
    match device.enum_formats() {
        Ok(list) if !list.is_empty() => Probe::Capture(caps.card),
        _ => Probe::NotCapture,
    }
}

/// An opened V4L2 device
struct V4l2Source {
    path: String,
    device: Device,
}

impl MediaSource for V4l2Source {
    fn native_media_types(&mut self) -> Result<Vec<MediaType>> {
        let descriptions = self.device.enum_formats().map_err(|e| {
            IrviewError::open_device(format!("VIDIOC_ENUM_FMT on {}: {}", self.path, e))
        })?;

        let mut types = Vec::new();
        for description in descriptions {
            let fourcc = description.fourcc;
            let subtype = u32::from_le_bytes(fourcc.repr);
            let sizes = match self.device.enum_framesizes(fourcc) {
                Ok(sizes) => sizes,
                Err(e) => {
                    debug!("No frame sizes for {}: {}", formats::format_name(subtype), e);
                    continue;
                }
            };

            for size in sizes {
                let dims = match size.size {
                    FrameSizeEnum::Discrete(d) => vec![(d.width, d.height)],
                    FrameSizeEnum::Stepwise(s) => {
                        vec![(s.min_width, s.min_height), (s.max_width, s.max_height)]
                    }
                };
                for (width, height) in dims {
                    let rate = self.first_frame_rate(fourcc, width, height);
                    types.push(MediaType::video(subtype, width, height, rate));
                }
            }
        }
        Ok(types)
    }

    fn into_reader(self: Box<Self>, config: &ReaderConfig) -> Result<Box<dyn SourceReader>> {
        let OutputFormat::Bgra32 = config.output;
        let V4l2Source { path, device } = *self;

        let current = device
            .format()
            .map_err(|e| IrviewError::open_device(format!("VIDIOC_G_FMT on {}: {}", path, e)))?;
        let (width, height) = config
            .preferred_size
            .unwrap_or((current.width, current.height));

        let offered: Vec<u32> = device
            .enum_formats()
            .map_err(|e| IrviewError::open_device(format!("VIDIOC_ENUM_FMT on {}: {}", path, e)))?
            .iter()
            .map(|d| u32::from_le_bytes(d.fourcc.repr))
            .collect();

        let mut negotiated = None;
        for code in NEGOTIATION_ORDER.iter().filter(|c| offered.contains(*c)) {
            let request = Format::new(width, height, FourCC::new(&code.to_le_bytes()));
            match device.set_format(&request) {
                Ok(format) => {
                    let actual = u32::from_le_bytes(format.fourcc.repr);
                    if let Some(layout) = SourceLayout::from_fourcc(actual) {
                        negotiated = Some((format, layout));
                        break;
                    }
                    debug!(
                        "Driver answered {} for {}",
                        formats::format_name(actual),
                        formats::format_name(*code)
                    );
                }
                Err(e) => debug!("VIDIOC_S_FMT {} failed: {}", formats::format_name(*code), e),
            }
        }

        let Some((format, layout)) = negotiated else {
            return Err(IrviewError::open_device(undecodable_message(&path, &offered)));
        };

        let stride = if format.stride > 0 {
            format.stride as usize
        } else {
            format.width as usize * layout.bytes_per_pixel()
        };

        let mut stream = Stream::with_buffers(&device, Type::VideoCapture, config.buffer_count)
            .map_err(|e| {
                IrviewError::open_device(format!("Failed to map buffers on {}: {}", path, e))
            })?;
        if let Some(timeout) = config.read_timeout {
            // The poll argument is a C int; longer waits would not fit
            stream.set_timeout(timeout.min(Duration::from_millis(MAX_READ_TIMEOUT_MS)));
        }

        info!(
            "Negotiated {} {}x{} (stride {}) on {}",
            formats::format_name(u32::from_le_bytes(format.fourcc.repr)),
            format.width,
            format.height,
            stride,
            path
        );

        Ok(Box::new(V4l2Reader {
            stream,
            _device: device,
            path,
            width: format.width,
            height: format.height,
            stride,
            layout,
            converted: Vec::new(),
            stalled: false,
        }))
    }
}

impl V4l2Source {
    fn first_frame_rate(&self, fourcc: FourCC, width: u32, height: u32) -> Ratio {
        let intervals = match self.device.enum_frameintervals(fourcc, width, height) {
            Ok(intervals) => intervals,
            Err(_) => return Ratio::default(),
        };
        intervals
            .first()
            .map(|i| interval_rate(&i.interval))
            .unwrap_or_default()
    }
}

/// Frame rate for a declared frame interval
///
/// Intervals are seconds per frame, so the rate is the reciprocal. A
/// stepwise range reports its shortest interval.
fn interval_rate(interval: &FrameIntervalEnum) -> Ratio {
    match interval {
        FrameIntervalEnum::Discrete(f) => Ratio::new(f.denominator, f.numerator),
        FrameIntervalEnum::Stepwise(s) => Ratio::new(s.min.denominator, s.min.numerator),
    }
}

/// Open error text for a device offering nothing the reader can decode
fn undecodable_message(path: &str, offered: &[u32]) -> String {
    let names: Vec<String> = offered.iter().map(|c| formats::format_name(*c)).collect();
    if !offered.is_empty() && offered.iter().all(|c| formats::is_compressed(*c)) {
        format!(
            "{} only offers compressed formats ({}); no decoder is available",
            path,
            names.join(", ")
        )
    } else {
        format!(
            "{} offers no decodable format (offered: {})",
            path,
            names.join(", ")
        )
    }
}

/// A streaming V4L2 device
struct V4l2Reader {
    // Declared before `device` so buffers are unmapped before the fd closes
    stream: Stream<'static>,
    _device: Device,
    path: String,
    width: u32,
    height: u32,
    stride: usize,
    layout: SourceLayout,
    converted: Vec<u8>,
    /// Last dequeue timed out with every buffer still queued
    stalled: bool,
}

impl SourceReader for V4l2Reader {
    fn frame_size(&self) -> Result<(u32, u32)> {
        Ok((self.width, self.height))
    }

    fn read_sample(&mut self) -> Result<Option<Sample<'_>>> {
        if self.stalled {
            // Restart so `next()` does not queue the same buffer twice
            StreamTrait::stop(&mut self.stream).map_err(|e| {
                IrviewError::acquisition(format!("VIDIOC_STREAMOFF on {}: {}", self.path, e))
            })?;
            self.stalled = false;
        }

        let (data, meta) = match self.stream.next() {
            Ok(next) => next,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                trace!("No frame from {} within the poll timeout", self.path);
                self.stalled = true;
                return Ok(None);
            }
            Err(e) if e.raw_os_error() == Some(libc::ENODEV) => {
                return Err(IrviewError::acquisition(format!("{} was disconnected", self.path)));
            }
            Err(e) => {
                return Err(IrviewError::acquisition(format!(
                    "VIDIOC_DQBUF on {}: {}",
                    self.path, e
                )));
            }
        };

        let used = match meta.bytesused as usize {
            0 => data.len(),
            n => n.min(data.len()),
        };
        let sequence = meta.sequence as u64;

        match self.layout {
            SourceLayout::Bgra32 => Ok(Some(
                Sample::single(&data[..used])
                    .with_pitch(self.stride as i32)
                    .with_sequence(sequence),
            )),
            SourceLayout::Yuyv => {
                if !formats::yuyv_to_bgra(
                    &data[..used],
                    self.stride,
                    self.width,
                    self.height,
                    &mut self.converted,
                ) {
                    warn!("Short YUYV buffer from {} ({} bytes)", self.path, used);
                    return Ok(Some(Sample::default().with_sequence(sequence)));
                }
                Ok(Some(
                    Sample::single(Cow::Borrowed(self.converted.as_slice()))
                        .with_pitch(self.width as i32 * 4)
                        .with_sequence(sequence),
                ))
            }
        }
    }
}
