//! Merging virtual and connected devices into one device list

use runtarget_core::{Device, LaunchCompatibility, PhysicalDevice, VirtualDevice};

use crate::avds::AvdDescriptor;
use crate::snapshots::list_snapshots;
use crate::sources::ConnectedDevice;

/// Build the (not yet connected) device for an AVD, reading its snapshots
pub fn build_virtual_device(avd: AvdDescriptor) -> VirtualDevice {
    let snapshots = list_snapshots(&avd.data_folder, avd.force_cold_boot);

    let device = VirtualDevice::new(avd.name, avd.display_name)
        .with_path(&avd.data_folder)
        .with_snapshots(snapshots)
        .with_device_type(avd.device_type);

    match avd.validity_reason {
        Some(reason) => device
            .with_launch_compatibility(LaunchCompatibility::error(reason.clone()))
            .with_validity_reason(reason),
        None => device,
    }
}

/// Combine AVDs with the devices attached to adb
///
/// An emulator instance that reports the AVD's data folder or name is folded
/// into that AVD, which keeps its on-disk name and snapshots and takes the
/// instance's serial number and connection time. Folded instances are not
/// listed again; every remaining connected device becomes a physical device.
pub fn merge_devices(
    virtual_devices: Vec<VirtualDevice>,
    connected: Vec<ConnectedDevice>,
) -> Vec<Device> {
    let mut remaining = connected;
    let mut devices = Vec::with_capacity(virtual_devices.len() + remaining.len());

    for device in virtual_devices {
        let position = remaining.iter().position(|c| is_instance_of(c, &device));
        let device = match position.map(|i| remaining.remove(i)) {
            Some(instance) => match (instance.is_online(), instance.connection_time) {
                (true, Some(time)) => device.connected(instance.serial_number, time),
                _ => device,
            },
            None => device,
        };
        devices.push(Device::Virtual(device));
    }

    devices.extend(remaining.into_iter().map(|c| Device::Physical(physical_device(c))));
    devices
}

fn is_instance_of(connected: &ConnectedDevice, device: &VirtualDevice) -> bool {
    if !connected.is_emulator {
        return false;
    }
    let same_path = matches!(
        (connected.avd_path.as_deref(), device.path()),
        (Some(a), Some(b)) if a == b
    );
    same_path || connected.avd_name.as_deref() == Some(device.avd_name())
}

fn physical_device(connected: ConnectedDevice) -> PhysicalDevice {
    let name = connected.display_name();
    let compatibility = connected.state.launch_compatibility();
    PhysicalDevice::new(connected.serial_number, name, connected.connection_time)
        .with_launch_compatibility(compatibility)
        .with_device_type(connected.device_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::AdbDeviceState;
    use runtarget_core::test_utils::{test_time, test_virtual_device};
    use runtarget_core::{DeviceType, Key, LaunchCompatibilityState};
    use std::path::PathBuf;

    fn emulator(serial: &str, avd_name: Option<&str>, avd_path: Option<&str>) -> ConnectedDevice {
        let mut device = ConnectedDevice::new(serial, AdbDeviceState::Online);
        device.avd_name = avd_name.map(String::from);
        device.avd_path = avd_path.map(PathBuf::from);
        device.connection_time = Some(test_time(10));
        device
    }

    #[test]
    fn test_build_virtual_device_invalid_avd() {
        let avd = AvdDescriptor {
            name: "Ghost".to_string(),
            display_name: "Ghost".to_string(),
            data_folder: PathBuf::from("/nowhere/Ghost.avd"),
            device_type: DeviceType::Tv,
            force_cold_boot: false,
            validity_reason: Some("AVD data folder is missing".to_string()),
        };

        let device = Device::Virtual(build_virtual_device(avd));
        assert!(!device.is_valid());
        assert_eq!(device.device_type(), DeviceType::Tv);
        assert_eq!(
            device.launch_compatibility().state,
            LaunchCompatibilityState::Error
        );
        assert_eq!(device.key(), &Key::virtual_device_path("/nowhere/Ghost.avd"));
    }

    #[test]
    fn test_merge_attaches_emulator_by_path() {
        let devices = merge_devices(
            vec![test_virtual_device("Pixel_6")],
            vec![emulator("emulator-5554", None, Some("/avd/Pixel_6.avd"))],
        );

        assert_eq!(devices.len(), 1);
        let device = &devices[0];
        assert!(device.is_virtual());
        assert_eq!(device.name(), "Pixel 6");
        assert_eq!(device.connection_time(), Some(test_time(10)));
        assert!(device.matches(&Key::serial_number("emulator-5554")));
    }

    #[test]
    fn test_merge_attaches_emulator_by_name() {
        let devices = merge_devices(
            vec![test_virtual_device("Pixel_6"), test_virtual_device("Tablet")],
            vec![emulator("emulator-5556", Some("Tablet"), None)],
        );

        assert_eq!(devices.len(), 2);
        assert!(!devices[0].is_connected());
        assert!(devices[1].is_connected());
    }

    #[test]
    fn test_merge_keeps_physical_devices() {
        let mut phone = ConnectedDevice::new("R58M123", AdbDeviceState::Unauthorized);
        phone.model = Some("Galaxy S21".to_string());

        let devices = merge_devices(vec![test_virtual_device("Pixel_6")], vec![phone]);

        assert_eq!(devices.len(), 2);
        let physical = &devices[1];
        assert!(!physical.is_virtual());
        assert_eq!(physical.name(), "Galaxy S21");
        assert!(!physical.is_connected());
        assert_eq!(
            physical.launch_compatibility().state,
            LaunchCompatibilityState::Error
        );
    }

    #[test]
    fn test_offline_emulator_is_not_double_counted() {
        let mut instance = emulator("emulator-5554", Some("Pixel_6"), None);
        instance.state = AdbDeviceState::Offline;
        instance.connection_time = None;

        let devices = merge_devices(vec![test_virtual_device("Pixel_6")], vec![instance]);

        assert_eq!(devices.len(), 1);
        assert!(!devices[0].is_connected());
    }

    #[test]
    fn test_unknown_emulator_becomes_physical_entry() {
        let devices = merge_devices(
            Vec::new(),
            vec![emulator("emulator-5560", Some("Deleted_AVD"), None)],
        );

        assert_eq!(devices.len(), 1);
        assert!(devices[0].matches(&Key::serial_number("emulator-5560")));
    }
}
