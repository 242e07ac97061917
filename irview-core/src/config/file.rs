//! Configuration file loading
//!
//! Loads user configuration from `~/.config/irview/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::EngineConfig;
use crate::error::{IrviewError, Result};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Capture settings
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Preview settings
    #[serde(default)]
    pub preview: PreviewSettings,
}

/// Device and acquisition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Default device index
    #[serde(default)]
    pub device: usize,

    /// Preferred width (0 = device default)
    #[serde(default)]
    pub width: u32,

    /// Preferred height (0 = device default)
    #[serde(default)]
    pub height: u32,

    /// Read poll timeout in milliseconds (0 = block until a frame)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Driver buffers per session
    #[serde(default = "default_buffer_count")]
    pub buffer_count: u32,

    /// Frame rate assumed when a device declares none
    #[serde(default = "default_fallback_frame_rate")]
    pub fallback_frame_rate: u32,
}

/// Render loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewSettings {
    /// Renderer pull rate
    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_buffer_count() -> u32 {
    4
}

fn default_fallback_frame_rate() -> u32 {
    30
}

fn default_fps() -> u32 {
    30
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            device: 0,
            width: 0,
            height: 0,
            read_timeout_ms: default_read_timeout_ms(),
            buffer_count: default_buffer_count(),
            fallback_frame_rate: default_fallback_frame_rate(),
        }
    }
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("irview").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("irview")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/irview/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| IrviewError::config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| IrviewError::config(format!("Failed to parse config file: {}", e)))?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    IrviewError::config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| IrviewError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| IrviewError::config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Engine settings described by this file
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let capture = &self.capture;
        let preferred_size = match (capture.width, capture.height) {
            (0, 0) => None,
            (width, height) if width > 0 && height > 0 => Some((width, height)),
            (width, height) => {
                return Err(IrviewError::config(format!(
                    "width and height must both be set or both be 0 (got {}x{})",
                    width, height
                )));
            }
        };

        let config = EngineConfig {
            preferred_size,
            read_timeout: match capture.read_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            buffer_count: capture.buffer_count,
            fallback_frame_rate: capture.fallback_frame_rate,
        };

        config.validate_strict().map_err(IrviewError::config)?;
        for warning in config.validate() {
            warn!("{}", warning);
        }
        Ok(config)
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# irview configuration

[capture]
# Device index as listed by `irview list`
device = 0

# Preferred resolution; 0 x 0 keeps the device's current format
width = 0
height = 0

# How long one read waits for a frame before re-checking for shutdown
# (milliseconds, 0 = wait indefinitely)
read_timeout_ms = 1000

# Driver buffers queued per session (1-32)
buffer_count = 4

# Frame rate reported for formats that declare none
fallback_frame_rate = 30

[preview]
# Renderer pull rate for `irview preview`
fps = 30
"#
    .to_string()
}
