//! Configuration types

use std::path::{Path, PathBuf};
use std::time::Duration;

use runtarget_core::prelude::*;
use runtarget_discovery::SdkLocations;
use serde::{Deserialize, Serialize};

/// Application settings (.runtarget/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub discovery: DiscoverySettings,

    #[serde(default)]
    pub selection: SelectionSettings,
}

impl Settings {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.discovery.poll_interval_ms == 0 {
            return Err(Error::config("discovery.poll_interval_ms must be positive"));
        }
        if self.discovery.timeout_secs == 0 {
            return Err(Error::config("discovery.timeout_secs must be positive"));
        }
        for (name, value) in [
            ("state_file", &self.selection.state_file),
            ("connection_times_file", &self.selection.connection_times_file),
        ] {
            if value.trim().is_empty() || Path::new(value).is_absolute() {
                return Err(Error::config(format!(
                    "selection.{} must be a relative file name, got {:?}",
                    name, value
                )));
            }
        }
        if self.selection.state_file == self.selection.connection_times_file {
            return Err(Error::config(
                "selection.state_file and selection.connection_times_file must differ",
            ));
        }
        Ok(())
    }
}

/// Device discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiscoverySettings {
    /// Refresh cadence in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bound for one discovery cycle
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Explicit adb executable (else SDK root, then PATH)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adb_path: Option<PathBuf>,

    /// Explicit AVD home (else $ANDROID_AVD_HOME, then ~/.android/avd)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avd_home: Option<PathBuf>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_timeout_secs(),
            adb_path: None,
            avd_home: None,
        }
    }
}

impl DiscoverySettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sdk_locations(&self) -> SdkLocations {
        SdkLocations::locate(self.adb_path.as_deref(), self.avd_home.as_deref())
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    20
}

/// Selection persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SelectionSettings {
    /// State file, relative to `.runtarget/`
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// When each attached device was first seen, relative to `.runtarget/`
    #[serde(default = "default_connection_times_file")]
    pub connection_times_file: String,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            connection_times_file: default_connection_times_file(),
        }
    }
}

fn default_state_file() -> String {
    "selection.toml".to_string()
}

fn default_connection_times_file() -> String {
    "connections.toml".to_string()
}
