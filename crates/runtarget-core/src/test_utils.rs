//! Test utilities for device types
//!
//! Provides helper functions for creating test devices.

use chrono::{DateTime, TimeZone, Utc};

use crate::device::{Device, PhysicalDevice, VirtualDevice};

/// A fixed instant `hour` hours into 2024-05-01 UTC.
pub fn test_time(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

/// Creates a disconnected virtual device keyed by `/avd/<avd_name>.avd`.
///
/// The display name is the AVD name with underscores replaced by spaces.
pub fn test_virtual_device(avd_name: &str) -> VirtualDevice {
    VirtualDevice::new(avd_name, avd_name.replace('_', " ")).with_path(test_avd_path(avd_name))
}

/// Data folder path used by [`test_virtual_device`].
pub fn test_avd_path(avd_name: &str) -> String {
    format!("/avd/{}.avd", avd_name)
}

/// Creates a running virtual device.
pub fn test_running_virtual_device(
    avd_name: &str,
    serial_number: &str,
    connected_at: DateTime<Utc>,
) -> Device {
    Device::Virtual(test_virtual_device(avd_name).connected(serial_number, connected_at))
}

/// Creates a connected physical device.
pub fn test_physical_device(serial_number: &str, name: &str, connected_at: DateTime<Utc>) -> Device {
    Device::Physical(PhysicalDevice::new(serial_number, name, Some(connected_at)))
}
