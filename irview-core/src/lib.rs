//! irview Core Library
//!
//! Camera capture engine for live preview and still capture.
//!
//! This library provides:
//! - Device enumeration and connectivity queries
//! - Format discovery and negotiation of a decoded 32-bit BGRA stream
//! - A background acquisition loop handing the latest frame to a
//!   pull-based renderer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │ Platform (V4L2) │───▶│ Acquisition loop │───▶│ Frame exchange  │◀── fetch_frame
//! │ enumerate/open  │    │ (own thread)     │    │ (latest frame)  │◀── capture_photo
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```

pub mod capture;
pub mod catalog;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod exchange;
pub mod formats;
pub mod negotiate;
pub mod platform;
pub mod types;

pub use command::{Command, Response};
pub use config::{ConfigFile, EngineConfig};
pub use controller::Engine;
pub use error::{IrviewError, Result};
pub use types::{
    DeviceDescriptor, DeviceEvent, DeviceStatus, FormatCandidate, FrameNotice, FrameSnapshot,
    SessionId, SessionState, SessionStats,
};
