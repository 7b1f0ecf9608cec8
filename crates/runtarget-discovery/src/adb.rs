//! Connected-device discovery using adb
//!
//! `adb devices -l` supplies the serial numbers and states. Online devices are
//! then queried for their system properties, and emulator instances for the
//! AVD they were started from, so they can be merged with the AVD list.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use runtarget_core::prelude::*;
use runtarget_core::DeviceType;
use tokio::process::Command;
use tokio::time::timeout;

use crate::connection_times::ConnectionTimes;
use crate::sdk::SdkLocations;
use crate::sources::{AdbDeviceState, ConnectedDevice, ConnectedDeviceSource};

/// Default timeout for a single adb invocation
const ADB_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// `<serial> <state> [key:value ...]`
static DEVICE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+(no permissions|\S+)\s*(.*)$").expect("Invalid device line regex")
});

static PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+):(\S+)").expect("Invalid property regex"));

/// One line of `adb devices -l`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbListing {
    pub serial_number: String,
    pub state: AdbDeviceState,
    pub model: Option<String>,
    pub product: Option<String>,
}

/// Parse the output of `adb devices -l`
///
/// Header and daemon status lines are ignored.
pub fn parse_adb_devices(output: &str) -> Vec<AdbListing> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !line.starts_with("List of devices") && !line.starts_with('*')
        })
        .filter_map(|line| DEVICE_LINE.captures(line))
        .map(|caps| {
            let rest = caps.get(3).map_or("", |m| m.as_str());
            let property = |name: &str| {
                PROPERTY
                    .captures_iter(rest)
                    .find(|p| &p[1] == name)
                    .map(|p| p[2].to_string())
            };

            AdbListing {
                serial_number: caps[1].to_string(),
                state: AdbDeviceState::parse(&caps[2]),
                model: property("model").map(|m| m.replace('_', " ")),
                product: property("product"),
            }
        })
        .collect()
}

/// First meaningful line of an emulator console reply
///
/// The console answers `<value>\r\nOK`; a reply starting with `KO` is a
/// failure.
fn parse_console_reply(output: &str) -> Option<String> {
    let first = output.lines().map(str::trim).find(|line| !line.is_empty())?;
    if first == "OK" || first.starts_with("KO") {
        return None;
    }
    Some(first.to_string())
}

/// Connected-device source backed by the adb executable
#[derive(Debug)]
pub struct AdbDeviceSource {
    locations: SdkLocations,
    command_timeout: Duration,
    connection_times: ConnectionTimes,
}

impl AdbDeviceSource {
    pub fn new(locations: &SdkLocations) -> Self {
        Self {
            locations: locations.clone(),
            command_timeout: ADB_COMMAND_TIMEOUT,
            connection_times: ConnectionTimes::new(),
        }
    }

    pub fn with_command_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    /// Use `connection_times` instead of times private to this source
    pub fn with_connection_times(mut self, connection_times: ConnectionTimes) -> Self {
        self.connection_times = connection_times;
        self
    }

    /// Run adb and return its stdout
    async fn run_adb(&self, args: &[&str]) -> Result<String> {
        let adb = self.locations.require_adb()?;

        let output = timeout(self.command_timeout, run_command(adb, args))
            .await
            .map_err(|_| Error::adb(format!("adb {} timed out", args.join(" "))))??;

        Ok(output)
    }

    async fn get_prop(&self, serial: &str, property: &str) -> Option<String> {
        self.run_adb(&["-s", serial, "shell", "getprop", property])
            .await
            .inspect_err(|e| debug!("getprop {} on {} failed: {}", property, serial, e))
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    async fn emulator_console(&self, serial: &str, command: &str) -> Option<String> {
        self.run_adb(&["-s", serial, "emu", "avd", command])
            .await
            .inspect_err(|e| debug!("emu avd {} on {} failed: {}", command, serial, e))
            .ok()
            .and_then(|reply| parse_console_reply(&reply))
    }

    async fn describe(&self, listing: AdbListing) -> ConnectedDevice {
        let mut device = ConnectedDevice::new(listing.serial_number, listing.state);
        device.model = listing.model;

        if !device.is_online() {
            return device;
        }

        let serial = device.serial_number.clone();
        if let Some(model) = self.get_prop(&serial, "ro.product.model").await {
            device.model = Some(model);
        }
        device.manufacturer = self.get_prop(&serial, "ro.product.manufacturer").await;
        device.device_type = self
            .get_prop(&serial, "ro.build.characteristics")
            .await
            .map(|c| DeviceType::from_characteristics(&c))
            .unwrap_or_default();

        if device.is_emulator {
            device.avd_name = self.emulator_console(&serial, "name").await;
            device.avd_path = self
                .emulator_console(&serial, "path")
                .await
                .map(|path| canonical_path(Path::new(&path)));
        }

        device
    }

    /// List attached devices with connection times filled in
    pub async fn list(&self) -> Result<Vec<ConnectedDevice>> {
        let output = self.run_adb(&["devices", "-l"]).await?;
        // The property queries below can take seconds per device
        let listed_at = Utc::now();
        let listings = parse_adb_devices(&output);
        trace!("adb listed {} devices", listings.len());

        let mut devices = Vec::with_capacity(listings.len());
        for listing in listings {
            devices.push(self.describe(listing).await);
        }

        let times = self.connection_times.observe(
            devices
                .iter()
                .filter(|d| d.is_online())
                .map(|d| d.serial_number.as_str()),
            listed_at,
        );
        for device in &mut devices {
            device.connection_time = times.get(&device.serial_number).copied();
        }

        Ok(devices)
    }
}

impl ConnectedDeviceSource for AdbDeviceSource {
    async fn connected_devices(&self) -> Result<Vec<ConnectedDevice>> {
        self.list().await
    }
}

async fn run_command(adb: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new(adb)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::AdbNotFound
            } else {
                Error::adb(format!("Failed to run adb: {}", e))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::adb(format!(
            "adb {} failed with exit code {:?}: {}",
            args.join(" "),
            output.status.code(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn canonical_path(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_adb_devices() {
        let output = "List of devices attached\n\
            emulator-5554          device product:sdk_gphone64_x86_64 model:sdk_gphone64_x86_64 device:emu64x transport_id:1\n\
            R58M123                unauthorized usb:1-1 transport_id:2\n\
            192.168.1.20:5555      device product:panther model:Pixel_7 device:panther transport_id:3\n\
            \n";

        let devices = parse_adb_devices(output);
        assert_eq!(devices.len(), 3);

        assert_eq!(devices[0].serial_number, "emulator-5554");
        assert_eq!(devices[0].state, AdbDeviceState::Online);
        assert_eq!(devices[0].product.as_deref(), Some("sdk_gphone64_x86_64"));

        assert_eq!(devices[1].serial_number, "R58M123");
        assert_eq!(devices[1].state, AdbDeviceState::Unauthorized);
        assert!(devices[1].model.is_none());

        assert_eq!(devices[2].serial_number, "192.168.1.20:5555");
        assert_eq!(devices[2].model.as_deref(), Some("Pixel 7"));
    }

    #[test]
    fn test_parse_adb_devices_ignores_daemon_lines() {
        let output = "* daemon not running; starting now at tcp:5037\n\
            * daemon started successfully\n\
            List of devices attached\n";
        assert!(parse_adb_devices(output).is_empty());
    }

    #[test]
    fn test_parse_adb_devices_no_permissions() {
        let output = "List of devices attached\n\
            0123456789ABCDEF       no permissions (user in plugdev group; are your udev rules wrong?); see [http://developer.android.com/tools/device.html]\n";
        let devices = parse_adb_devices(output);
        assert_eq!(devices.len(), 1);
        assert_eq!(
            devices[0].state,
            AdbDeviceState::Other("no permissions".to_string())
        );
    }

    #[test]
    fn test_parse_console_reply() {
        assert_eq!(
            parse_console_reply("Pixel_6_API_33\r\nOK\r\n"),
            Some("Pixel_6_API_33".to_string())
        );
        assert_eq!(
            parse_console_reply("/home/me/.android/avd/Pixel_6_API_33.avd\nOK\n"),
            Some("/home/me/.android/avd/Pixel_6_API_33.avd".to_string())
        );
        assert_eq!(parse_console_reply("KO: unknown command\r\n"), None);
        assert_eq!(parse_console_reply("OK\r\n"), None);
        assert_eq!(parse_console_reply(""), None);
    }

    #[tokio::test]
    async fn test_list_without_adb_fails_with_adb_not_found() {
        let source = AdbDeviceSource::new(&SdkLocations::default());
        let result = source.connected_devices().await;
        assert!(matches!(result, Err(Error::AdbNotFound)));
    }

    #[tokio::test]
    async fn test_missing_adb_binary_is_adb_not_found() {
        let locations = SdkLocations {
            adb_path: Some(PathBuf::from("/definitely/not/here/adb")),
            ..Default::default()
        };
        let source = AdbDeviceSource::new(&locations);
        assert!(matches!(source.list().await, Err(Error::AdbNotFound)));
    }

    /// Shell script answering like adb with one emulator attached
    #[cfg(unix)]
    fn fake_adb(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = r#"#!/bin/sh
case "$*" in
  "devices -l")
    printf 'List of devices attached\nemulator-5554 device product:sdk_gphone64 model:sdk_gphone64 transport_id:1\n' ;;
  *"emu avd name"*)
    printf 'Pixel_6\r\nOK\r\n' ;;
  *"emu avd path"*)
    printf '/avd/Pixel_6.avd\r\nOK\r\n' ;;
  *"ro.product.manufacturer"*)
    echo Google ;;
  *)
    echo ;;
esac
"#;
        let path = dir.join("adb");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial_test::serial]
    async fn test_connection_time_is_stable_across_invocations() {
        let dir = tempfile::TempDir::new().unwrap();
        let locations = SdkLocations {
            adb_path: Some(fake_adb(dir.path())),
            ..Default::default()
        };
        let times_path = dir.path().join(".runtarget").join("connections.toml");

        // Each invocation of the tool builds its own source
        let first = AdbDeviceSource::new(&locations)
            .with_connection_times(ConnectionTimes::persistent(&times_path))
            .list()
            .await
            .unwrap();
        let second = AdbDeviceSource::new(&locations)
            .with_connection_times(ConnectionTimes::persistent(&times_path))
            .list()
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].avd_name.as_deref(), Some("Pixel_6"));
        assert_eq!(first[0].manufacturer.as_deref(), Some("Google"));
        assert!(first[0].connection_time.is_some());
        assert_eq!(second[0].connection_time, first[0].connection_time);
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial_test::serial]
    async fn test_connection_time_taken_when_listed() {
        let dir = tempfile::TempDir::new().unwrap();
        let locations = SdkLocations {
            adb_path: Some(fake_adb(dir.path())),
            ..Default::default()
        };

        let before = Utc::now();
        let devices = AdbDeviceSource::new(&locations).list().await.unwrap();
        let after = Utc::now();

        let time = devices[0].connection_time.unwrap();
        assert!(before <= time && time <= after);
    }
}
