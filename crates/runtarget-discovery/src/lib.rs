//! # runtarget-discovery - Android Device Discovery
//!
//! Builds the list of devices a run can target from two sources: the AVD
//! definitions on disk and the devices attached to adb. Running emulators are
//! folded into the AVD they were started from.
//!
//! Depends on [`runtarget_core`] for the device model and error handling.
//!
//! ## Public API
//!
//! ### Sources
//! - [`VirtualDeviceSource`], [`AvdDirectorySource`] - AVDs from the AVD home
//! - [`ConnectedDeviceSource`], [`AdbDeviceSource`] - Devices attached to adb
//! - [`SdkLocations`] - Where adb and the AVD home live
//!
//! ### Pipeline
//! - [`DevicesTask`] - One discovery cycle (both sources, merged, failures degraded)
//! - [`DeviceRefresher`] - Repeated cycles where newer results supersede older ones
//! - [`merge_devices()`] - Fold emulator instances into their AVDs
//!
//! ### Snapshots
//! - [`list_snapshots()`] - Boot snapshots of an AVD
//! - [`decode_snapshot_proto()`] - Minimal `snapshot.pb` decoder

pub mod adb;
pub mod avds;
pub mod connection_times;
pub mod merge;
pub mod refresher;
pub mod sdk;
pub mod snapshots;
pub mod sources;
pub mod task;

pub use adb::{parse_adb_devices, AdbDeviceSource, AdbListing};
pub use avds::{list_avds, AvdDescriptor, MISSING_DATA_FOLDER, MISSING_SYSTEM_IMAGE};
pub use connection_times::ConnectionTimes;
pub use merge::{build_virtual_device, merge_devices};
pub use refresher::{DeviceRefresher, DeviceSnapshot, DEFAULT_POLL_INTERVAL};
pub use sdk::SdkLocations;
pub use snapshots::{decode_snapshot_proto, list_snapshots, read_snapshot, SnapshotProto};
pub use sources::{
    AdbDeviceState, AvdDirectorySource, ConnectedDevice, ConnectedDeviceSource,
    LocalConnectedDeviceSource, VirtualDeviceSource,
};
pub use task::{AndroidDevicesTask, DevicesTask, FailureLog, DEFAULT_DISCOVERY_TIMEOUT};
