//! Data source seams for the discovery pipeline
//!
//! The virtual-device source is synchronous file I/O and runs on a blocking
//! worker. The connected-device source is asynchronous and may fail
//! transiently.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use runtarget_core::prelude::*;
use runtarget_core::{DeviceType, LaunchCompatibility};

use crate::avds::{list_avds, AvdDescriptor};
use crate::sdk::SdkLocations;

/// State reported by `adb devices`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdbDeviceState {
    Online,
    Offline,
    Unauthorized,
    Other(String),
}

impl AdbDeviceState {
    pub fn parse(state: &str) -> Self {
        match state {
            "device" => AdbDeviceState::Online,
            "offline" => AdbDeviceState::Offline,
            "unauthorized" => AdbDeviceState::Unauthorized,
            other => AdbDeviceState::Other(other.to_string()),
        }
    }

    pub fn is_online(&self) -> bool {
        *self == AdbDeviceState::Online
    }

    pub fn launch_compatibility(&self) -> LaunchCompatibility {
        match self {
            AdbDeviceState::Online => LaunchCompatibility::yes(),
            AdbDeviceState::Offline => LaunchCompatibility::warning("Device is offline"),
            AdbDeviceState::Unauthorized => LaunchCompatibility::error("Device is unauthorized"),
            AdbDeviceState::Other(state) => {
                LaunchCompatibility::error(format!("Device is in state \"{}\"", state))
            }
        }
    }
}

/// A device attached to adb (physical, or a running emulator)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedDevice {
    pub serial_number: String,
    pub state: AdbDeviceState,
    /// Whether adb identifies this as an emulator instance
    pub is_emulator: bool,
    /// AVD name reported by the emulator console
    pub avd_name: Option<String>,
    /// AVD data folder reported by the emulator console
    pub avd_path: Option<PathBuf>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub device_type: DeviceType,
    /// When the device was first seen online; `None` while not online
    pub connection_time: Option<DateTime<Utc>>,
}

impl ConnectedDevice {
    pub fn new(serial_number: impl Into<String>, state: AdbDeviceState) -> Self {
        let serial_number = serial_number.into();
        Self {
            is_emulator: serial_number.starts_with("emulator-"),
            serial_number,
            state,
            avd_name: None,
            avd_path: None,
            manufacturer: None,
            model: None,
            device_type: DeviceType::Phone,
            connection_time: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.state.is_online()
    }

    /// "Google Pixel 7", falling back to the model, then the serial number
    pub fn display_name(&self) -> String {
        match (&self.manufacturer, &self.model) {
            (Some(manufacturer), Some(model))
                if !model.to_lowercase().starts_with(&manufacturer.to_lowercase()) =>
            {
                format!("{} {}", manufacturer, model)
            }
            (_, Some(model)) => model.clone(),
            _ => self.serial_number.clone(),
        }
    }
}

/// Enumerates AVD definitions
pub trait VirtualDeviceSource: Send + Sync + 'static {
    fn list_avds(&self) -> Result<Vec<AvdDescriptor>>;
}

/// Reads AVDs from the AVD home directory
#[derive(Debug, Clone)]
pub struct AvdDirectorySource {
    locations: SdkLocations,
}

impl AvdDirectorySource {
    pub fn new(locations: SdkLocations) -> Self {
        Self { locations }
    }
}

impl VirtualDeviceSource for AvdDirectorySource {
    fn list_avds(&self) -> Result<Vec<AvdDescriptor>> {
        list_avds(&self.locations)
    }
}

/// Lists devices currently attached to adb
#[trait_variant::make(ConnectedDeviceSource: Send)]
pub trait LocalConnectedDeviceSource {
    async fn connected_devices(&self) -> Result<Vec<ConnectedDevice>>;
}
