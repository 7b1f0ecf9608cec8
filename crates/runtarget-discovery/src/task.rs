//! One discovery cycle
//!
//! [`DevicesTask::collect`] lists AVDs on a blocking worker while the
//! connected-device source runs, waits for both and merges the results.
//! Source failures never reach the caller: the cycle degrades to whatever
//! the other source produced.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use runtarget_core::prelude::*;
use runtarget_core::{Device, VirtualDevice};
use tokio::time::timeout;

use crate::adb::AdbDeviceSource;
use crate::connection_times::ConnectionTimes;
use crate::merge::{build_virtual_device, merge_devices};
use crate::sdk::SdkLocations;
use crate::sources::{
    AvdDirectorySource, ConnectedDevice, ConnectedDeviceSource, VirtualDeviceSource,
};

/// Default bound for one discovery cycle
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(20);

/// Logs each distinct failure message once
///
/// Polling hits the same failure (adb missing, daemon down) every cycle;
/// only the first occurrence is a warning.
#[derive(Debug, Default)]
pub struct FailureLog {
    seen: Mutex<HashSet<String>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time `message` is recorded
    pub fn record(&self, source: &str, message: &str) -> bool {
        let first = self
            .seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(format!("{}: {}", source, message));

        if first {
            warn!("{} failed: {}", source, message);
        } else {
            debug!("{} failed again: {}", source, message);
        }
        first
    }
}

/// Collects the device list from both sources
pub struct DevicesTask<V, C> {
    virtual_source: Arc<V>,
    connected_source: Arc<C>,
    timeout: Duration,
    failures: Arc<FailureLog>,
}

impl<V, C> Clone for DevicesTask<V, C> {
    fn clone(&self) -> Self {
        Self {
            virtual_source: Arc::clone(&self.virtual_source),
            connected_source: Arc::clone(&self.connected_source),
            timeout: self.timeout,
            failures: Arc::clone(&self.failures),
        }
    }
}

impl<V, C> DevicesTask<V, C>
where
    V: VirtualDeviceSource,
    C: ConnectedDeviceSource + Sync + 'static,
{
    pub fn new(virtual_source: V, connected_source: C) -> Self {
        Self {
            virtual_source: Arc::new(virtual_source),
            connected_source: Arc::new(connected_source),
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
            failures: Arc::new(FailureLog::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one cycle and return the merged, unordered device list
    pub async fn collect(&self) -> Vec<Device> {
        let virtual_source = Arc::clone(&self.virtual_source);
        let virtual_task = tokio::task::spawn_blocking(move || {
            virtual_source
                .list_avds()
                .map(|avds| avds.into_iter().map(build_virtual_device).collect::<Vec<_>>())
        });

        let (virtual_result, connected_result) = tokio::join!(
            timeout(self.timeout, virtual_task),
            timeout(self.timeout, self.connected_source.connected_devices()),
        );

        let virtual_devices = self.virtual_devices(virtual_result);
        let connected = self.connected_devices(connected_result);

        trace!(
            "Discovery cycle found {} AVDs and {} connected devices",
            virtual_devices.len(),
            connected.len()
        );
        merge_devices(virtual_devices, connected)
    }

    fn virtual_devices(
        &self,
        result: std::result::Result<
            std::result::Result<Result<Vec<VirtualDevice>>, tokio::task::JoinError>,
            tokio::time::error::Elapsed,
        >,
    ) -> Vec<VirtualDevice> {
        let error = match result {
            Ok(Ok(Ok(devices))) => return devices,
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(e)) => format!("AVD listing task failed: {}", e),
            Err(_) => Error::DiscoveryTimeout {
                secs: self.timeout.as_secs(),
            }
            .to_string(),
        };
        self.failures.record("Virtual device source", &error);
        Vec::new()
    }

    fn connected_devices(
        &self,
        result: std::result::Result<Result<Vec<ConnectedDevice>>, tokio::time::error::Elapsed>,
    ) -> Vec<ConnectedDevice> {
        let error = match result {
            Ok(Ok(devices)) => return devices,
            Ok(Err(e)) => e.to_string(),
            Err(_) => Error::DiscoveryTimeout {
                secs: self.timeout.as_secs(),
            }
            .to_string(),
        };
        self.failures.record("Connected device source", &error);
        Vec::new()
    }
}

/// Discovery over the local Android SDK
pub type AndroidDevicesTask = DevicesTask<AvdDirectorySource, AdbDeviceSource>;

impl AndroidDevicesTask {
    /// `connection_times` decides how long a connected device counts as
    /// connected; pass a persistent one to carry that across processes
    pub fn android(locations: SdkLocations, connection_times: ConnectionTimes) -> Self {
        let adb = AdbDeviceSource::new(&locations).with_connection_times(connection_times);
        DevicesTask::new(AvdDirectorySource::new(locations), adb)
    }
}
