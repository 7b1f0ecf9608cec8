//! Android SDK tool and directory lookup
//!
//! Resolves where `adb` lives, where the SDK root is, and which directory
//! holds AVD definitions. Explicit overrides (from settings) win over
//! environment variables, which win over the conventional defaults.

use std::path::{Path, PathBuf};

use runtarget_core::prelude::*;

/// Resolved SDK locations for device discovery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdkLocations {
    /// Path to the `adb` executable if found
    pub adb_path: Option<PathBuf>,

    /// Android SDK root if known
    pub sdk_root: Option<PathBuf>,

    /// Directory holding `<name>.ini` AVD definitions
    pub avd_home: PathBuf,
}

impl SdkLocations {
    /// Resolve locations, preferring explicit overrides
    pub fn locate(adb_override: Option<&Path>, avd_home_override: Option<&Path>) -> Self {
        let sdk_root = Self::find_sdk_root();
        let adb_path = adb_override
            .map(Path::to_path_buf)
            .or_else(|| Self::find_adb(sdk_root.as_deref()));
        let avd_home = avd_home_override
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_avd_home);

        debug!(
            "SDK locations: adb={:?} sdk_root={:?} avd_home={:?}",
            adb_path, sdk_root, avd_home
        );

        Self {
            adb_path,
            sdk_root,
            avd_home,
        }
    }

    /// `adb` path or [`Error::AdbNotFound`]
    pub fn require_adb(&self) -> Result<&Path> {
        self.adb_path.as_deref().ok_or(Error::AdbNotFound)
    }

    fn find_sdk_root() -> Option<PathBuf> {
        ["ANDROID_HOME", "ANDROID_SDK_ROOT"]
            .iter()
            .filter_map(|var| std::env::var_os(var))
            .map(PathBuf::from)
            .find(|path| path.is_dir())
    }

    fn find_adb(sdk_root: Option<&Path>) -> Option<PathBuf> {
        let adb_name = if cfg!(windows) { "adb.exe" } else { "adb" };

        if let Some(root) = sdk_root {
            let candidate = root.join("platform-tools").join(adb_name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        which::which("adb")
            .inspect_err(|e| debug!("adb not on PATH: {}", e))
            .ok()
    }

    /// `$ANDROID_AVD_HOME`, else `$ANDROID_USER_HOME/avd`, else `~/.android/avd`
    fn default_avd_home() -> PathBuf {
        if let Some(home) = std::env::var_os("ANDROID_AVD_HOME") {
            return PathBuf::from(home);
        }
        if let Some(user_home) = std::env::var_os("ANDROID_USER_HOME") {
            return PathBuf::from(user_home).join("avd");
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".android")
            .join("avd")
    }

    /// Resolve an `image.sysdir.N` value from an AVD config against the SDK root
    pub fn system_image_dir(&self, sysdir: &str) -> Option<PathBuf> {
        let sysdir = Path::new(sysdir);
        if sysdir.is_absolute() {
            return Some(sysdir.to_path_buf());
        }
        self.sdk_root.as_ref().map(|root| root.join(sysdir))
    }
}
