//! Deployment targets: which device to use and how to boot it

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::key::Key;

/// How a run should obtain its device
///
/// Every target names its device by [`Key`]; the boot-mode variants only
/// differ in how a virtual device that is not yet running gets started.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    /// Boot from the default (quick boot) snapshot
    QuickBoot { key: Key },

    /// Boot without loading any snapshot
    ColdBoot { key: Key },

    /// Boot from a named snapshot directory
    BootWithSnapshot { key: Key, snapshot: PathBuf },

    /// Use the device as it is currently running
    RunningDevice { key: Key },
}

impl Target {
    pub fn quick_boot(key: Key) -> Self {
        Target::QuickBoot { key }
    }

    pub fn cold_boot(key: Key) -> Self {
        Target::ColdBoot { key }
    }

    pub fn boot_with_snapshot(key: Key, snapshot: impl Into<PathBuf>) -> Self {
        Target::BootWithSnapshot {
            key,
            snapshot: snapshot.into(),
        }
    }

    pub fn running_device(key: Key) -> Self {
        Target::RunningDevice { key }
    }

    pub fn key(&self) -> &Key {
        match self {
            Target::QuickBoot { key }
            | Target::ColdBoot { key }
            | Target::BootWithSnapshot { key, .. }
            | Target::RunningDevice { key } => key,
        }
    }

    pub fn snapshot(&self) -> Option<&Path> {
        match self {
            Target::BootWithSnapshot { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_running_device(&self) -> bool {
        matches!(self, Target::RunningDevice { .. })
    }

    /// Whether `device` can satisfy this target
    ///
    /// The device must match the key. A snapshot target additionally needs
    /// the device to carry that snapshot directory, and a running-device
    /// target needs the device to be connected.
    pub fn matches(&self, device: &Device) -> bool {
        if !device.matches(self.key()) {
            return false;
        }

        match self {
            Target::QuickBoot { .. } | Target::ColdBoot { .. } => true,
            Target::BootWithSnapshot { snapshot, .. } => device
                .snapshots()
                .iter()
                .any(|s| s.path() == snapshot.as_path()),
            Target::RunningDevice { .. } => device.is_connected(),
        }
    }

    /// Short label for the boot mode
    pub fn boot_mode(&self) -> &'static str {
        match self {
            Target::QuickBoot { .. } => "quick boot",
            Target::ColdBoot { .. } => "cold boot",
            Target::BootWithSnapshot { .. } => "boot with snapshot",
            Target::RunningDevice { .. } => "running",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::BootWithSnapshot { key, snapshot } => {
                write!(f, "{} ({} {})", key, self.boot_mode(), snapshot.display())
            }
            _ => write!(f, "{} ({})", self.key(), self.boot_mode()),
        }
    }
}
