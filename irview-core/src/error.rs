//! Error types for irview

use thiserror::Error;

/// Result type alias using IrviewError
pub type Result<T> = std::result::Result<T, IrviewError>;

/// Main error type for irview operations
#[derive(Debug, Error)]
pub enum IrviewError {
    /// The platform device registry could not be queried
    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    /// Index out of range, activation failure or format negotiation failure
    #[error("Failed to open device: {0}")]
    OpenDevice(String),

    /// Still capture requested before the first frame or after close
    #[error("No frame available")]
    NoFrameAvailable,

    /// The acquisition loop could not read from the device
    #[error("Acquisition fault: {0}")]
    Acquisition(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unsupported operation or pixel format
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<IrviewError>,
    },
}

impl IrviewError {
    /// Create an enumeration error
    pub fn enumeration(msg: impl Into<String>) -> Self {
        Self::Enumeration(msg.into())
    }

    /// Create an open-device error
    pub fn open_device(msg: impl Into<String>) -> Self {
        Self::OpenDevice(msg.into())
    }

    /// Create an acquisition error
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers
    pub fn root(&self) -> &IrviewError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Stable machine-readable code used by the command surface
    pub fn code(&self) -> &'static str {
        match self {
            Self::Enumeration(_) => "ENUM_FAILED",
            Self::OpenDevice(_) => "OPEN_FAILED",
            Self::NoFrameAvailable => "NO_FRAME",
            Self::Acquisition(_) => "ACQUISITION",
            Self::Config(_) => "CONFIG",
            Self::Unsupported(_) => "UNSUPPORTED",
            Self::Io(_) => "IO",
            Self::WithContext { source, .. } => source.code(),
        }
    }

    /// A hint the user can act on, if there is one
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::Enumeration(_) => {
                Some("Check that the video4linux devices under /dev are readable (video group)")
            }
            Self::OpenDevice(_) => Some(
                "Run 'irview list' to see current device indices; the camera may be in use by another application",
            ),
            Self::NoFrameAvailable => {
                Some("Start a preview with 'irview preview' and wait for the first frame")
            }
            Self::Config(_) => Some("Check ~/.config/irview/config.toml for errors"),
            Self::Unsupported(_) => Some(
                "The camera must offer an uncompressed 32-bit RGB or YUYV format",
            ),
            _ => None,
        }
    }

    /// Whether the user can recover by retrying or fixing their setup
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self.root(),
            Self::Enumeration(_) | Self::OpenDevice(_) | Self::NoFrameAvailable | Self::Config(_)
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
