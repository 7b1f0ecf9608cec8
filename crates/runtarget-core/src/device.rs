//! Devices a run can target
//!
//! Devices are rebuilt from scratch on every discovery cycle and never
//! mutated afterwards. Identity across cycles is established only through
//! [`Device::matches`] against a [`Key`].

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::key::Key;
use crate::snapshot::{Snapshot, DEFAULT_SNAPSHOT_COLLECTION};
use crate::target::Target;

/// Form factor, in presentation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    #[default]
    Phone,
    Wear,
    Tv,
    Automotive,
}

impl DeviceType {
    /// Classify from an AVD `tag.id` value
    pub fn from_avd_tag(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        if tag.contains("wear") {
            DeviceType::Wear
        } else if tag.contains("tv") {
            DeviceType::Tv
        } else if tag.contains("automotive") {
            DeviceType::Automotive
        } else {
            DeviceType::Phone
        }
    }

    /// Classify from the `ro.build.characteristics` system property
    pub fn from_characteristics(characteristics: &str) -> Self {
        let mut kinds = characteristics.split(',').map(str::trim);
        if kinds.clone().any(|c| c == "watch") {
            DeviceType::Wear
        } else if kinds.clone().any(|c| c == "tv") {
            DeviceType::Tv
        } else if kinds.any(|c| c == "automotive") {
            DeviceType::Automotive
        } else {
            DeviceType::Phone
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Phone => write!(f, "Phone"),
            DeviceType::Wear => write!(f, "Wear"),
            DeviceType::Tv => write!(f, "TV"),
            DeviceType::Automotive => write!(f, "Automotive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchCompatibilityState {
    #[default]
    Yes,
    Warning,
    Error,
}

/// Whether the project can be launched on a device, and why not
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct LaunchCompatibility {
    pub state: LaunchCompatibilityState,
    pub reason: Option<String>,
}

impl LaunchCompatibility {
    pub fn yes() -> Self {
        Self::default()
    }

    pub fn warning(reason: impl Into<String>) -> Self {
        Self {
            state: LaunchCompatibilityState::Warning,
            reason: Some(reason.into()),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            state: LaunchCompatibilityState::Error,
            reason: Some(reason.into()),
        }
    }

    pub fn is_yes(&self) -> bool {
        self.state == LaunchCompatibilityState::Yes
    }
}

/// Reference to the live adb instance backing a device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    serial_number: String,
}

impl DeviceHandle {
    pub fn new(serial_number: impl Into<String>) -> Self {
        Self {
            serial_number: serial_number.into(),
        }
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }
}

// ─────────────────────────────────────────────────────────────────
// Physical devices
// ─────────────────────────────────────────────────────────────────

/// A device attached over USB or Wi-Fi
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDevice {
    name: String,
    key: Key,
    connection_time: Option<DateTime<Utc>>,
    launch_compatibility: LaunchCompatibility,
    device_type: DeviceType,
    handle: DeviceHandle,
}

impl PhysicalDevice {
    /// `connection_time` is `None` while adb reports the device as not yet
    /// usable (offline, unauthorized).
    pub fn new(
        serial_number: impl Into<String>,
        name: impl Into<String>,
        connection_time: Option<DateTime<Utc>>,
    ) -> Self {
        let serial_number = serial_number.into();
        Self {
            name: name.into(),
            key: Key::SerialNumber(serial_number.clone()),
            connection_time,
            launch_compatibility: LaunchCompatibility::yes(),
            device_type: DeviceType::Phone,
            handle: DeviceHandle::new(serial_number),
        }
    }

    pub fn with_launch_compatibility(mut self, compatibility: LaunchCompatibility) -> Self {
        self.launch_compatibility = compatibility;
        self
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn serial_number(&self) -> &str {
        self.handle.serial_number()
    }

    fn matches(&self, key: &Key) -> bool {
        match key {
            Key::SerialNumber(serial) | Key::NonprefixedKey(serial) => {
                serial == self.serial_number()
            }
            Key::VirtualDevicePath(_) | Key::VirtualDeviceName(_) => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Virtual devices
// ─────────────────────────────────────────────────────────────────

/// An AVD, running or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDevice {
    avd_name: String,
    name: String,
    key: Key,
    name_key: Key,
    connection_time: Option<DateTime<Utc>>,
    snapshots: Vec<Snapshot>,
    validity_reason: Option<String>,
    launch_compatibility: LaunchCompatibility,
    device_type: DeviceType,
    handle: Option<DeviceHandle>,
}

impl VirtualDevice {
    /// Create a virtual device known only by AVD name
    ///
    /// Its key stays name-based until [`VirtualDevice::with_path`] supplies
    /// the data folder.
    pub fn new(avd_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        let avd_name = avd_name.into();
        let name_key = Key::VirtualDeviceName(avd_name.clone());
        Self {
            avd_name,
            name: display_name.into(),
            key: name_key.clone(),
            name_key,
            connection_time: None,
            snapshots: DEFAULT_SNAPSHOT_COLLECTION.clone(),
            validity_reason: None,
            launch_compatibility: LaunchCompatibility::yes(),
            device_type: DeviceType::Phone,
            handle: None,
        }
    }

    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.key = Key::VirtualDevicePath(path.as_ref().to_path_buf());
        self
    }

    pub fn with_snapshots(mut self, snapshots: Vec<Snapshot>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_validity_reason(mut self, reason: impl Into<String>) -> Self {
        self.validity_reason = Some(reason.into());
        self
    }

    pub fn with_launch_compatibility(mut self, compatibility: LaunchCompatibility) -> Self {
        self.launch_compatibility = compatibility;
        self
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    /// Attach the running emulator instance
    pub fn connected(
        mut self,
        serial_number: impl Into<String>,
        connection_time: DateTime<Utc>,
    ) -> Self {
        self.handle = Some(DeviceHandle::new(serial_number));
        self.connection_time = Some(connection_time);
        self
    }

    pub fn avd_name(&self) -> &str {
        &self.avd_name
    }

    pub fn path(&self) -> Option<&Path> {
        self.key.as_path()
    }

    fn matches(&self, key: &Key) -> bool {
        match key {
            Key::VirtualDevicePath(path) => self.path() == Some(path.as_path()),
            Key::VirtualDeviceName(_) | Key::NonprefixedKey(_) => {
                key.avd_name() == Some(self.avd_name.as_str())
            }
            Key::SerialNumber(serial) => match (&self.handle, self.connection_time) {
                (Some(handle), Some(_)) => handle.serial_number() == serial,
                _ => false,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Device
// ─────────────────────────────────────────────────────────────────

/// A physical or virtual device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    Physical(PhysicalDevice),
    Virtual(VirtualDevice),
}

impl Device {
    pub fn name(&self) -> &str {
        match self {
            Device::Physical(d) => &d.name,
            Device::Virtual(d) => &d.name,
        }
    }

    /// Canonical key: serial number for physical devices, data folder path
    /// (or AVD name when the path is unknown) for virtual devices
    pub fn key(&self) -> &Key {
        match self {
            Device::Physical(d) => &d.key,
            Device::Virtual(d) => &d.key,
        }
    }

    /// Name-based key of a virtual device
    pub fn name_key(&self) -> Option<&Key> {
        match self {
            Device::Physical(_) => None,
            Device::Virtual(d) => Some(&d.name_key),
        }
    }

    pub fn connection_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Device::Physical(d) => d.connection_time,
            Device::Virtual(d) => d.connection_time,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_time().is_some()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        match self {
            Device::Physical(_) => &[],
            Device::Virtual(d) => &d.snapshots,
        }
    }

    pub fn has_default_snapshot(&self) -> bool {
        self.snapshots().iter().any(Snapshot::is_default)
    }

    /// Why the device cannot be picked automatically, if it cannot
    pub fn validity_reason(&self) -> Option<&str> {
        match self {
            Device::Physical(_) => None,
            Device::Virtual(d) => d.validity_reason.as_deref(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validity_reason().is_none()
    }

    pub fn launch_compatibility(&self) -> &LaunchCompatibility {
        match self {
            Device::Physical(d) => &d.launch_compatibility,
            Device::Virtual(d) => &d.launch_compatibility,
        }
    }

    pub fn device_type(&self) -> DeviceType {
        match self {
            Device::Physical(d) => d.device_type,
            Device::Virtual(d) => d.device_type,
        }
    }

    pub fn handle(&self) -> Option<&DeviceHandle> {
        match self {
            Device::Physical(d) => Some(&d.handle),
            Device::Virtual(d) => d.handle.as_ref(),
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Device::Virtual(_))
    }

    /// Whether `key` denotes this device in any of its representations
    ///
    /// Physical devices match their serial number. Virtual devices match
    /// their exact data folder path, their AVD name (as a name key or as the
    /// name part of a legacy `name/snapshot` token) and, while running, the
    /// serial number of the emulator instance.
    pub fn matches(&self, key: &Key) -> bool {
        match self {
            Device::Physical(d) => d.matches(key),
            Device::Virtual(d) => d.matches(key),
        }
    }

    /// Target to use when nothing more specific was chosen
    pub fn default_target(&self) -> Target {
        let key = self.key().clone();
        if self.is_connected() {
            Target::running_device(key)
        } else if self.has_default_snapshot() {
            Target::quick_boot(key)
        } else {
            Target::cold_boot(key)
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
