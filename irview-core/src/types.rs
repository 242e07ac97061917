//! Core types for irview
//!
//! Query results, session identifiers and frame snapshots shared between
//! the capture engine and its consumers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for unique session IDs
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a preview session
///
/// Consumers address renderer pulls with it; it is invalidated when the
/// session closes or is superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a new unique session ID
    pub fn next() -> Self {
        Self(SESSION_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SessionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

/// A capture device as seen by one enumeration
///
/// `index` is only meaningful within the enumeration that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Position in the enumeration
    pub index: usize,
    /// Human-readable device name
    pub name: String,
}

impl std::fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.index, self.name)
    }
}

/// Connectivity report for one device index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// Index is within the current device count
    pub connected: bool,
    /// Device identity could be read
    pub available: bool,
    /// Number of devices in the current enumeration
    pub device_count: u32,
    /// Device name, if it could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Enumeration error, when the report degraded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeviceStatus {
    /// All-false status carrying an error description
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// A resolution and frame rate the device declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatCandidate {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frames per second
    pub frame_rate_hz: u32,
}

impl std::fmt::Display for FormatCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} @ {}fps", self.width, self.height, self.frame_rate_hz)
    }
}

/// An independent copy of the latest frame
///
/// Pixels are 32-bit BGRA, tightly packed (`width * 4` bytes per row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    /// Pixel data
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Generation of the frame exchange when copied
    pub generation: u64,
}

impl FrameSnapshot {
    /// Row size in bytes
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// View the frame as BGRA pixels
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.data)
    }
}

/// Out-of-band "new frame available" notice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameNotice {
    /// Session that produced the frame
    pub session: Option<SessionId>,
    /// Generation after the publish
    pub generation: u64,
}

/// Lifecycle state of the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session, or the acquisition loop has ended
    Closed,
    /// Negotiating a new session
    Opening,
    /// Acquisition loop running
    Running,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Closed => write!(f, "closed"),
            SessionState::Opening => write!(f, "opening"),
            SessionState::Running => write!(f, "running"),
        }
    }
}

/// Statistics for the current session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Session ID
    pub session: SessionId,
    /// Device index the session was opened with
    pub device_index: usize,
    /// Negotiated width
    pub width: u32,
    /// Negotiated height
    pub height: u32,
    /// Frames published to the exchange
    pub frames_acquired: u64,
    /// Samples dropped because of malformed buffers
    pub frames_skipped: u64,
    /// Whether the acquisition loop is still running
    pub running: bool,
}

/// Device arrival/removal hint from the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceEvent {
    /// A device was attached
    Arrived,
    /// A device was detached
    Removed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_degraded_status() {
        let status = DeviceStatus::degraded("registry unavailable");
        assert!(!status.connected);
        assert!(!status.available);
        assert_eq!(status.device_count, 0);
        assert_eq!(status.error.as_deref(), Some("registry unavailable"));
    }

    #[test]
    fn test_snapshot_pixels() {
        let snapshot = FrameSnapshot {
            data: vec![1, 2, 3, 4, 5, 6, 7, 8],
            width: 2,
            height: 1,
            generation: 1,
        };
        assert_eq!(snapshot.stride(), 8);
        assert_eq!(snapshot.pixels(), &[[1, 2, 3, 4], [5, 6, 7, 8]]);
    }
}
