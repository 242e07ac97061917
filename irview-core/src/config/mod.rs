//! Engine configuration

mod file;

pub use file::{ConfigFile, sample_config};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::platform::{OutputFormat, ReaderConfig};

/// Largest number of driver buffers the engine will request
pub const MAX_BUFFER_COUNT: u32 = 32;

/// Longest read timeout the driver poll accepts (its argument is a C `int`)
pub const MAX_READ_TIMEOUT_MS: u64 = i32::MAX as u64;

/// Settings for an [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Resolution hint forwarded to negotiation
    pub preferred_size: Option<(u32, u32)>,
    /// Poll timeout for one hardware read (`None` blocks until a frame)
    pub read_timeout: Option<Duration>,
    /// Driver buffers queued per session
    pub buffer_count: u32,
    /// Rate reported when a device declares a zero denominator
    pub fallback_frame_rate: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preferred_size: None,
            read_timeout: Some(Duration::from_millis(1000)),
            buffer_count: 4,
            fallback_frame_rate: 30,
        }
    }
}

impl EngineConfig {
    /// Set the preferred resolution
    pub fn with_preferred_size(mut self, width: u32, height: u32) -> Self {
        self.preferred_size = Some((width, height));
        self
    }

    /// Set the read timeout (`None` disables it)
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the number of driver buffers
    pub fn with_buffer_count(mut self, count: u32) -> Self {
        self.buffer_count = count;
        self
    }

    /// Set the fallback frame rate
    pub fn with_fallback_frame_rate(mut self, rate: u32) -> Self {
        self.fallback_frame_rate = rate;
        self
    }

    /// Settings for the stream reader
    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            output: OutputFormat::Bgra32,
            preferred_size: self.preferred_size,
            read_timeout: self.read_timeout,
            buffer_count: self.buffer_count,
        }
    }

    /// Hard errors for settings that cannot work
    pub fn validate_strict(&self) -> Result<(), String> {
        if self.buffer_count == 0 || self.buffer_count > MAX_BUFFER_COUNT {
            return Err(format!(
                "buffer_count must be between 1 and {} (got {})",
                MAX_BUFFER_COUNT, self.buffer_count
            ));
        }

        if let Some(timeout) = self.read_timeout {
            if timeout.as_millis() > MAX_READ_TIMEOUT_MS as u128 {
                return Err(format!(
                    "read_timeout must be at most {} ms (got {} ms)",
                    MAX_READ_TIMEOUT_MS,
                    timeout.as_millis()
                ));
            }
        }

        if self.fallback_frame_rate == 0 {
            return Err("fallback_frame_rate cannot be zero".to_string());
        }

        if let Some((width, height)) = self.preferred_size {
            if width == 0 || height == 0 {
                return Err(format!("Preferred size {}x{} has a zero side", width, height));
            }
        }

        Ok(())
    }

    /// Soft warnings about unusual settings
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.read_timeout.is_none() {
            warnings.push(
                "Read timeout disabled: closing a session waits for the next frame from the device"
                    .to_string(),
            );
        }

        if self.buffer_count < 2 {
            warnings.push("A single driver buffer will drop frames while one is copied".to_string());
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.fallback_frame_rate, 30);
        assert_eq!(config.read_timeout, Some(Duration::from_millis(1000)));
        assert!(config.validate_strict().is_ok());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_reader_config() {
        let reader = EngineConfig::default()
            .with_preferred_size(640, 480)
            .with_buffer_count(2)
            .reader_config();
        assert_eq!(reader.preferred_size, Some((640, 480)));
        assert_eq!(reader.buffer_count, 2);
        assert_eq!(reader.output, OutputFormat::Bgra32);
    }

    #[test]
    fn test_validate_strict() {
        assert!(EngineConfig::default().with_buffer_count(0).validate_strict().is_err());
        assert!(EngineConfig::default().with_buffer_count(64).validate_strict().is_err());
        assert!(EngineConfig::default().with_fallback_frame_rate(0).validate_strict().is_err());
        assert!(EngineConfig::default().with_preferred_size(0, 480).validate_strict().is_err());

        let longest = Duration::from_millis(MAX_READ_TIMEOUT_MS);
        assert!(EngineConfig::default().with_read_timeout(Some(longest)).validate_strict().is_ok());
        let too_long = longest + Duration::from_millis(1);
        assert!(EngineConfig::default().with_read_timeout(Some(too_long)).validate_strict().is_err());
    }

    #[test]
    fn test_validate_warnings() {
        let warnings = EngineConfig::default()
            .with_read_timeout(None)
            .with_buffer_count(1)
            .validate();
        assert_eq!(warnings.len(), 2);
    }
}
