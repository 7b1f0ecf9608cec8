//! Presentation order of devices
//!
//! Most significant first: connected before disconnected, fully launch
//! compatible before warning/error, device type, then case-insensitive name.
//! Devices equal on all four compare `Equal`, so a stable sort keeps their
//! discovery order.

use std::cmp::Ordering;

use crate::device::Device;

/// Total order used for listing devices and for picking a default
pub fn compare_devices(a: &Device, b: &Device) -> Ordering {
    b.is_connected()
        .cmp(&a.is_connected())
        .then_with(|| {
            b.launch_compatibility()
                .is_yes()
                .cmp(&a.launch_compatibility().is_yes())
        })
        .then_with(|| a.device_type().cmp(&b.device_type()))
        .then_with(|| compare_names(a.name(), b.name()))
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Sort devices in place into presentation order
pub fn sort_devices(devices: &mut [Device]) {
    devices.sort_by(compare_devices);
}

/// Highest-ranked device that may be picked automatically
pub fn first_valid_device(devices: &[Device]) -> Option<&Device> {
    devices
        .iter()
        .filter(|d| d.is_valid())
        .min_by(|a, b| compare_devices(a, b))
}
