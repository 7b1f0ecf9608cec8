//! Android AVD (Android Virtual Device) discovery
//!
//! AVDs are read straight from the AVD home directory rather than by running
//! `emulator -list-avds`: every `<name>.ini` there points at the AVD's data
//! folder, whose `config.ini` carries the display name, tag and boot options.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use runtarget_core::prelude::*;
use runtarget_core::DeviceType;

use crate::sdk::SdkLocations;

const AVD_INI_EXTENSION: &str = "ini";
const CONFIG_INI: &str = "config.ini";

/// Validity reasons reported for broken AVDs
pub const MISSING_DATA_FOLDER: &str = "AVD data folder is missing";
pub const MISSING_SYSTEM_IMAGE: &str = "Missing system image";

/// An AVD definition as found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvdDescriptor {
    /// AVD name (file stem of the `.ini`, used for `-avd`)
    pub name: String,
    /// Friendly display name
    pub display_name: String,
    /// Absolute, canonicalized data folder
    pub data_folder: PathBuf,
    /// Form factor from `tag.id`
    pub device_type: DeviceType,
    /// `fastboot.forceColdBoot=yes`: no quick boot snapshot is offered
    pub force_cold_boot: bool,
    /// Why this AVD cannot be launched, if it cannot
    pub validity_reason: Option<String>,
}

/// List every AVD under `locations.avd_home`
///
/// A missing AVD home is not an error (no AVDs yet). Individual `.ini` files
/// that cannot be read are skipped with a warning.
pub fn list_avds(locations: &SdkLocations) -> Result<Vec<AvdDescriptor>> {
    let avd_home = &locations.avd_home;
    let entries = match std::fs::read_dir(avd_home) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("AVD home {:?} does not exist", avd_home);
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(Error::avd(format!(
                "Failed to read AVD home {}: {}",
                avd_home.display(),
                e
            )))
        }
    };

    let mut avds = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(AVD_INI_EXTENSION) || !path.is_file()
        {
            continue;
        }
        match read_avd(&path, locations) {
            Ok(avd) => avds.push(avd),
            Err(e) => warn!("Skipping AVD {:?}: {}", path, e),
        }
    }

    avds.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("Found {} AVDs in {:?}", avds.len(), avd_home);
    Ok(avds)
}

/// Read one `<name>.ini` and the `config.ini` it points to
fn read_avd(ini_path: &Path, locations: &SdkLocations) -> Result<AvdDescriptor> {
    let name = ini_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| Error::avd(format!("No AVD name in {}", ini_path.display())))?;

    let ini = parse_ini(&std::fs::read_to_string(ini_path)?);
    let declared = ini
        .get("path")
        .map(PathBuf::from)
        .unwrap_or_else(|| locations.avd_home.join(format!("{}.avd", name)));
    let data_folder = dunce::canonicalize(&declared).unwrap_or(declared);

    if !data_folder.is_dir() {
        return Ok(AvdDescriptor {
            display_name: display_name_from_avd_name(&name),
            name,
            data_folder,
            device_type: DeviceType::Phone,
            force_cold_boot: false,
            validity_reason: Some(MISSING_DATA_FOLDER.to_string()),
        });
    }

    let config = match std::fs::read_to_string(data_folder.join(CONFIG_INI)) {
        Ok(content) => parse_ini(&content),
        Err(e) => {
            debug!("No config.ini for AVD {}: {}", name, e);
            HashMap::new()
        }
    };

    let display_name = config
        .get("avd.ini.displayname")
        .filter(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| display_name_from_avd_name(&name));

    let device_type = config
        .get("tag.id")
        .map(|tag| DeviceType::from_avd_tag(tag))
        .unwrap_or_default();

    let force_cold_boot = config
        .get("fastboot.forceColdBoot")
        .is_some_and(|v| v.eq_ignore_ascii_case("yes"));

    let validity_reason = config
        .get("image.sysdir.1")
        .and_then(|sysdir| locations.system_image_dir(sysdir))
        .filter(|dir| !dir.is_dir())
        .map(|_| MISSING_SYSTEM_IMAGE.to_string());

    Ok(AvdDescriptor {
        name,
        display_name,
        data_folder,
        device_type,
        force_cold_boot,
        validity_reason,
    })
}

/// Parse `key=value` lines, ignoring blanks and `#` comments
fn parse_ini(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// "Pixel_6_API_33" -> "Pixel 6 API 33"
fn display_name_from_avd_name(name: &str) -> String {
    name.replace('_', " ")
}
