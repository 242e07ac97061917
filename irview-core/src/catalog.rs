//! Device catalog: enumeration and connectivity status

use tracing::{debug, warn};

use crate::error::{IrviewError, Result};
use crate::platform::{DeviceEntry, Platform};
use crate::types::{DeviceDescriptor, DeviceStatus};

/// List attached capture devices whose name could be read
///
/// Indices are positions in the platform enumeration, so a device with an
/// unreadable name leaves a gap rather than shifting later devices.
pub fn enumerate(platform: &dyn Platform) -> Result<Vec<DeviceDescriptor>> {
    let entries = platform.enumerate()?;
    let devices: Vec<DeviceDescriptor> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry.name {
            Some(name) => Some(DeviceDescriptor { index, name }),
            None => {
                debug!("Device {} ({}) has no readable name", index, entry.id);
                None
            }
        })
        .collect();

    debug!("{} reported {} named device(s)", platform.name(), devices.len());
    Ok(devices)
}

/// Connectivity of one device index; never fails
pub fn status(platform: &dyn Platform, index: usize) -> DeviceStatus {
    let entries = match platform.enumerate() {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Status query for device {} degraded: {}", index, e);
            return DeviceStatus::degraded(e.to_string());
        }
    };

    let name = entries.get(index).and_then(|entry| entry.name.clone());
    DeviceStatus {
        connected: index < entries.len(),
        available: name.is_some(),
        device_count: entries.len() as u32,
        name,
        error: None,
    }
}

/// The registry entry at `index` in a fresh enumeration
pub(crate) fn resolve(platform: &dyn Platform, index: usize) -> Result<DeviceEntry> {
    let entries = platform
        .enumerate()
        .map_err(|e| IrviewError::open_device(e.to_string()))?;
    let count = entries.len();
    entries.into_iter().nth(index).ok_or_else(|| {
        IrviewError::open_device(format!(
            "device index {} out of range ({} device(s) attached)",
            index, count
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MediaSource;

    struct StaticPlatform(Option<Vec<DeviceEntry>>);

    impl Platform for StaticPlatform {
        fn name(&self) -> &str {
            "static"
        }

        fn enumerate(&self) -> Result<Vec<DeviceEntry>> {
            self.0
                .clone()
                .ok_or_else(|| IrviewError::enumeration("registry offline"))
        }

        fn activate(&self, _entry: &DeviceEntry) -> Result<Box<dyn MediaSource>> {
            Err(IrviewError::open_device("not activatable"))
        }
    }

    fn two_cameras() -> StaticPlatform {
        StaticPlatform(Some(vec![
            DeviceEntry::new("/dev/video0", "IR Camera"),
            DeviceEntry::unnamed("/dev/video2"),
            DeviceEntry::new("/dev/video4", "Webcam"),
        ]))
    }

    #[test]
    fn test_enumerate_skips_unnamed() {
        let devices = enumerate(&two_cameras()).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "IR Camera");
        assert_eq!(devices[1].index, 2);
    }

    #[test]
    fn test_enumerate_empty_is_ok() {
        let devices = enumerate(&StaticPlatform(Some(Vec::new()))).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_enumerate_failure() {
        let err = enumerate(&StaticPlatform(None)).unwrap_err();
        assert_eq!(err.code(), "ENUM_FAILED");
    }

    #[test]
    fn test_status_in_and_out_of_range() {
        let platform = two_cameras();

        let first = status(&platform, 0);
        assert!(first.connected && first.available);
        assert_eq!(first.device_count, 3);

        let unnamed = status(&platform, 1);
        assert!(unnamed.connected);
        assert!(!unnamed.available);

        let missing = status(&platform, 3);
        assert!(!missing.connected && !missing.available);
        assert_eq!(missing.device_count, 3);
    }

    #[test]
    fn test_status_degrades_on_failure() {
        let report = status(&StaticPlatform(None), 0);
        assert!(!report.connected);
        assert_eq!(report.device_count, 0);
        assert!(report.error.unwrap().contains("registry offline"));
    }

    #[test]
    fn test_resolve_out_of_range() {
        let err = resolve(&two_cameras(), 9).unwrap_err();
        assert_eq!(err.code(), "OPEN_FAILED");
    }
}
