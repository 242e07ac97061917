//! Command surface
//!
//! JSON messages a host application (or the CLI) sends to the engine, and
//! the replies it gets back. Errors carry the stable codes of
//! [`IrviewError::code`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::controller::Engine;
use crate::error::IrviewError;
use crate::types::{DeviceEvent, DeviceStatus, FormatCandidate, SessionId};

/// Code for requests that do not name a known method
pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

/// Requests to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Command {
    /// Names of attached devices
    EnumerateDevices,
    /// Connectivity of one device
    GetDeviceStatus { index: usize },
    /// Resolutions one device declares
    GetSupportedResolutions { index: usize },
    /// Open a device and start acquiring
    StartPreview {
        #[serde(default)]
        index: usize,
    },
    /// Close the open device
    CloseDevice,
    /// Copy of the latest frame
    CapturePhoto,
    /// Renderer pull for a session
    #[serde(rename_all = "camelCase")]
    FetchFrame {
        session: SessionId,
        #[serde(default)]
        requested_width: u32,
        #[serde(default)]
        requested_height: u32,
    },
    /// OS device arrival/removal hint
    DeviceChange { event: DeviceEvent },
}

/// Replies from the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    /// Acknowledgment
    Ok,
    /// Device names in enumeration order
    Devices { names: Vec<String> },
    /// Device connectivity
    Status(DeviceStatus),
    /// Unique resolutions
    Resolutions { resolutions: Vec<FormatCandidate> },
    /// A preview session was started
    Session { session: SessionId },
    /// Raw BGRA frame, `width * 4` bytes per row
    Frame {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
    /// Renderer pull found nothing to show
    NoFrame,
    /// Failure with a stable code
    Error { code: String, message: String },
}

impl Command {
    /// Serialize command to JSON bytes with newline terminator
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = serde_json::to_vec(self).unwrap_or_default();
        bytes.push(b'\n');
        bytes
    }

    /// Deserialize command from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl Response {
    /// Serialize response to JSON bytes with newline terminator
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = serde_json::to_vec(self).unwrap_or_default();
        bytes.push(b'\n');
        bytes
    }

    /// Deserialize response from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Error response for an engine error
    pub fn error(err: &IrviewError) -> Self {
        Response::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    /// Whether this is an error response
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

impl Engine {
    /// Run one command
    pub fn execute(&self, command: Command) -> Response {
        debug!("Executing {:?}", command);
        match command {
            Command::EnumerateDevices => match self.enumerate_devices() {
                Ok(devices) => Response::Devices {
                    names: devices.into_iter().map(|d| d.name).collect(),
                },
                Err(e) => Response::error(&e),
            },
            Command::GetDeviceStatus { index } => Response::Status(self.device_status(index)),
            Command::GetSupportedResolutions { index } => Response::Resolutions {
                resolutions: self.supported_resolutions(index),
            },
            Command::StartPreview { index } => match self.start_preview(index) {
                Ok(session) => Response::Session { session },
                Err(e) => Response::error(&e),
            },
            Command::CloseDevice => {
                self.close_device();
                Response::Ok
            }
            Command::CapturePhoto => match self.capture_photo() {
                Ok(frame) => Response::Frame {
                    width: frame.width,
                    height: frame.height,
                    data: frame.data,
                },
                Err(e) => Response::error(&e),
            },
            Command::FetchFrame {
                session,
                requested_width,
                requested_height,
            } => match self.fetch_frame(session, requested_width, requested_height) {
                Some(frame) => Response::Frame {
                    width: frame.width,
                    height: frame.height,
                    data: frame.data,
                },
                None => Response::NoFrame,
            },
            Command::DeviceChange { event } => {
                self.notify_device_change(event);
                Response::Ok
            }
        }
    }

    /// Decode and run one JSON command
    ///
    /// Requests that do not decode to a known method are answered with
    /// [`NOT_IMPLEMENTED`].
    pub fn dispatch(&self, bytes: &[u8]) -> Response {
        match Command::from_bytes(bytes) {
            Ok(command) => self.execute(command),
            Err(e) => Response::Error {
                code: NOT_IMPLEMENTED.to_string(),
                message: format!("Unrecognized command: {}", e),
            },
        }
    }
}
