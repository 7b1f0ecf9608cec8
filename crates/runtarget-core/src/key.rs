//! Device identity keys
//!
//! A single device can be addressed by several non-equivalent keys: a virtual
//! device is known by its data folder path, by its AVD name, and (while
//! running) by the serial number adb assigned to it. Two keys that denote the
//! same device are therefore not necessarily equal. Use
//! [`Device::matches`](crate::Device::matches) to decide whether a key refers
//! to a device, never `==` between keys of different kinds.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const SERIAL_NUMBER_TAG: &str = "SerialNumber";
const VIRTUAL_DEVICE_PATH_TAG: &str = "VirtualDevicePath";
const VIRTUAL_DEVICE_NAME_TAG: &str = "VirtualDeviceName";

/// Identity token for a device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Key {
    /// adb serial number; only meaningful while the device is connected
    SerialNumber(String),

    /// Absolute path to an AVD's data folder
    VirtualDevicePath(PathBuf),

    /// AVD name, used before the data folder is known and in older state
    VirtualDeviceName(String),

    /// Untagged token from historical state, possibly `"<name>/<snapshot>"`
    NonprefixedKey(String),
}

impl Key {
    pub fn serial_number(serial: impl Into<String>) -> Self {
        Key::SerialNumber(serial.into())
    }

    pub fn virtual_device_path(path: impl Into<PathBuf>) -> Self {
        Key::VirtualDevicePath(path.into())
    }

    pub fn virtual_device_name(name: impl Into<String>) -> Self {
        Key::VirtualDeviceName(name.into())
    }

    pub fn nonprefixed(value: impl Into<String>) -> Self {
        Key::NonprefixedKey(value.into())
    }

    /// The AVD name this key refers to, if it is name-based
    ///
    /// For a [`Key::NonprefixedKey`] any `/snapshot` suffix is stripped.
    pub fn avd_name(&self) -> Option<&str> {
        match self {
            Key::VirtualDeviceName(name) => Some(name),
            Key::NonprefixedKey(value) => Some(strip_snapshot_suffix(value)),
            Key::SerialNumber(_) | Key::VirtualDevicePath(_) => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Key::VirtualDevicePath(path) => Some(path),
            _ => None,
        }
    }

    pub fn as_serial_number(&self) -> Option<&str> {
        match self {
            Key::SerialNumber(serial) => Some(serial),
            _ => None,
        }
    }

    /// Tag written in front of the payload when persisted
    fn tag(&self) -> Option<&'static str> {
        match self {
            Key::SerialNumber(_) => Some(SERIAL_NUMBER_TAG),
            Key::VirtualDevicePath(_) => Some(VIRTUAL_DEVICE_PATH_TAG),
            Key::VirtualDeviceName(_) => Some(VIRTUAL_DEVICE_NAME_TAG),
            Key::NonprefixedKey(_) => None,
        }
    }

    /// Persisted form: `"<Tag>:<payload>"`, or the bare token for
    /// [`Key::NonprefixedKey`]
    pub fn to_persisted(&self) -> String {
        match self.tag() {
            Some(tag) => format!("{}:{}", tag, self),
            None => self.to_string(),
        }
    }

    /// Read a persisted key back
    ///
    /// Never fails: anything that is not a recognised `"<Tag>:<payload>"`
    /// pair is kept verbatim as a [`Key::NonprefixedKey`].
    pub fn from_persisted(value: &str) -> Self {
        match value.split_once(':') {
            Some((SERIAL_NUMBER_TAG, payload)) if !payload.is_empty() => {
                Key::SerialNumber(payload.to_string())
            }
            Some((VIRTUAL_DEVICE_PATH_TAG, payload)) if !payload.is_empty() => {
                Key::VirtualDevicePath(PathBuf::from(payload))
            }
            Some((VIRTUAL_DEVICE_NAME_TAG, payload)) if !payload.is_empty() => {
                Key::VirtualDeviceName(payload.to_string())
            }
            _ => Key::NonprefixedKey(value.to_string()),
        }
    }
}

fn strip_snapshot_suffix(value: &str) -> &str {
    value.split_once('/').map_or(value, |(name, _)| name)
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::SerialNumber(serial) => write!(f, "{}", serial),
            Key::VirtualDevicePath(path) => write!(f, "{}", path.display()),
            Key::VirtualDeviceName(name) => write!(f, "{}", name),
            Key::NonprefixedKey(value) => write!(f, "{}", value),
        }
    }
}

/// Strict parse for user input: rejects blank keys and tagged keys with an
/// empty payload.
impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_key(s));
        }

        if let Some((tag, payload)) = trimmed.split_once(':') {
            let known = matches!(
                tag,
                SERIAL_NUMBER_TAG | VIRTUAL_DEVICE_PATH_TAG | VIRTUAL_DEVICE_NAME_TAG
            );
            if known && payload.is_empty() {
                return Err(Error::invalid_key(s));
            }
        }

        Ok(Key::from_persisted(trimmed))
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_persisted()
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::from_persisted(&value)
    }
}
