//! Capture sessions
//!
//! - [`CaptureSession`]: one open device and its acquisition thread
//! - [`copy_rows`]: stride-aware copy of delivered rows into tight BGRA

mod copy;
mod session;

pub use copy::copy_rows;
pub use session::CaptureSession;
