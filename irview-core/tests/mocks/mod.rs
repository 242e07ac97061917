//! Mock infrastructure for testing
//!
//! A scripted platform whose devices produce numbered frames, and which
//! counts live device handles so tests can check nothing leaks.

#![allow(dead_code)]

use irview_core::error::{IrviewError, Result};
use irview_core::platform::{
    DeviceEntry, MediaSource, MediaType, Platform, Ratio, ReaderConfig, Sample, SourceReader,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Byte written into row padding; never part of a published frame
pub const PADDING_BYTE: u8 = 0xAA;

/// One simulated camera
#[derive(Debug, Clone)]
pub struct MockCamera {
    /// Friendly name, `None` if unreadable
    pub name: Option<String>,
    /// Negotiated width
    pub width: u32,
    /// Negotiated height
    pub height: u32,
    /// Extra bytes at the end of every row
    pub padding: usize,
    /// Report a negative pitch
    pub bottom_up: bool,
    /// Declared native media types
    pub media_types: Vec<MediaType>,
    /// Fail negotiation in `into_reader`
    pub fail_negotiation: bool,
    /// Fail every read after this many frames
    pub fail_after: Option<u64>,
}

impl MockCamera {
    /// A camera with a tight pitch and one declared format
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: Some(name.to_string()),
            width,
            height,
            padding: 0,
            bottom_up: false,
            media_types: vec![MediaType::video(0, width, height, Ratio::new(30, 1))],
            fail_negotiation: false,
            fail_after: None,
        }
    }

    /// A camera whose name cannot be read
    pub fn unnamed(width: u32, height: u32) -> Self {
        Self {
            name: None,
            ..Self::new("", width, height)
        }
    }

    /// Pad each row
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Report rows bottom-up
    pub fn bottom_up(mut self) -> Self {
        self.bottom_up = true;
        self
    }

    /// Replace the declared media types
    pub fn with_media_types(mut self, types: Vec<MediaType>) -> Self {
        self.media_types = types;
        self
    }

    /// Make negotiation fail
    pub fn failing_negotiation(mut self) -> Self {
        self.fail_negotiation = true;
        self
    }

    /// Make reads fail after `frames` frames
    pub fn failing_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }
}

/// Counts itself in the platform's live handle total while alive
struct HandleGuard(Arc<AtomicUsize>);

impl HandleGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scripted device registry
#[derive(Default)]
pub struct MockPlatform {
    cameras: Mutex<Vec<MockCamera>>,
    fail_enumerate: AtomicBool,
    live_handles: Arc<AtomicUsize>,
    activations: AtomicUsize,
}

impl MockPlatform {
    /// Create a platform with the given cameras attached
    pub fn new(cameras: Vec<MockCamera>) -> Arc<Self> {
        Arc::new(Self {
            cameras: Mutex::new(cameras),
            ..Self::default()
        })
    }

    /// Replace the attached cameras (hotplug)
    pub fn set_cameras(&self, cameras: Vec<MockCamera>) {
        *self.cameras.lock() = cameras;
    }

    /// Make enumeration fail
    pub fn set_enumerate_failure(&self, fail: bool) {
        self.fail_enumerate.store(fail, Ordering::SeqCst);
    }

    /// Activated devices not yet released
    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::SeqCst)
    }

    /// Total activations so far
    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }
}

impl Platform for MockPlatform {
    fn name(&self) -> &str {
        "mock"
    }

    fn enumerate(&self) -> Result<Vec<DeviceEntry>> {
        if self.fail_enumerate.load(Ordering::SeqCst) {
            return Err(IrviewError::enumeration("mock registry unavailable"));
        }
        Ok(self
            .cameras
            .lock()
            .iter()
            .enumerate()
            .map(|(i, camera)| match &camera.name {
                Some(name) => DeviceEntry::new(format!("mock:{}", i), name.clone()),
                None => DeviceEntry::unnamed(format!("mock:{}", i)),
            })
            .collect())
    }

    fn activate(&self, entry: &DeviceEntry) -> Result<Box<dyn MediaSource>> {
        let camera = entry
            .id
            .strip_prefix("mock:")
            .and_then(|i| i.parse::<usize>().ok())
            .and_then(|i| self.cameras.lock().get(i).cloned())
            .ok_or_else(|| IrviewError::open_device(format!("{} is gone", entry.id)))?;

        self.activations.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSource {
            guard: HandleGuard::new(&self.live_handles),
            camera,
        }))
    }
}

struct MockSource {
    guard: HandleGuard,
    camera: MockCamera,
}

impl MediaSource for MockSource {
    fn native_media_types(&mut self) -> Result<Vec<MediaType>> {
        Ok(self.camera.media_types.clone())
    }

    fn into_reader(self: Box<Self>, _config: &ReaderConfig) -> Result<Box<dyn SourceReader>> {
        if self.camera.fail_negotiation {
            return Err(IrviewError::Unsupported("no BGRA output".to_string()));
        }
        let MockSource { guard, camera } = *self;
        let stride = camera.width as usize * 4 + camera.padding;
        Ok(Box::new(MockReader {
            _guard: guard,
            buffer: vec![0; stride * camera.height as usize],
            stride,
            frame: 0,
            camera,
        }))
    }
}

struct MockReader {
    _guard: HandleGuard,
    camera: MockCamera,
    stride: usize,
    frame: u64,
    buffer: Vec<u8>,
}

impl SourceReader for MockReader {
    fn frame_size(&self) -> Result<(u32, u32)> {
        Ok((self.camera.width, self.camera.height))
    }

    fn read_sample(&mut self) -> Result<Option<Sample<'_>>> {
        std::thread::sleep(Duration::from_millis(2));
        if self.camera.fail_after.is_some_and(|n| self.frame >= n) {
            return Err(IrviewError::acquisition("mock device removed"));
        }

        self.frame += 1;
        let value = (self.frame % 100) as u8 + 1;
        let row = self.camera.width as usize * 4;
        for line in self.buffer.chunks_exact_mut(self.stride) {
            line[..row].fill(value);
            line[row..].fill(PADDING_BYTE);
        }

        let pitch = if self.camera.bottom_up {
            -(self.stride as i32)
        } else {
            self.stride as i32
        };
        Ok(Some(
            Sample::single(self.buffer.as_slice())
                .with_pitch(pitch)
                .with_sequence(self.frame),
        ))
    }
}

/// Poll `condition` until it holds or five seconds pass
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Whether every byte of a frame carries the same value
pub fn is_uniform(data: &[u8]) -> bool {
    data.first().is_some_and(|first| data.iter().all(|b| b == first))
}
