//! Command output as text or NDJSON events
//!
//! With `--json`, every event is one JSON object per line with an `event`
//! field naming its type:
//!
//! ```json
//! {"event":"device","name":"Pixel 6","key":"VirtualDevicePath:/home/me/.android/avd/Pixel_6.avd","kind":"virtual","connected_since":null,...}
//! {"event":"selected","target":{"type":"quick_boot","key":"VirtualDevicePath:/home/me/.android/avd/Pixel_6.avd"},"device":"Pixel 6","timestamp":1714557600000}
//! ```

use std::io::{self, Write};

use chrono::Utc;
use runtarget_core::{Device, DeviceType, LaunchCompatibilityState, Target};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub path: String,
    pub name: String,
}

/// Events printed by commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutputEvent {
    /// One listed device
    Device {
        name: String,
        key: String,
        kind: &'static str,
        device_type: DeviceType,
        connected_since: Option<String>,
        compatibility: LaunchCompatibilityState,
        compatibility_reason: Option<String>,
        validity_reason: Option<String>,
        snapshots: Vec<SnapshotInfo>,
    },

    /// Discovery found nothing
    NoDevices { timestamp: i64 },

    /// The combo-box target in effect
    Selected {
        target: Option<Target>,
        device: Option<String>,
        timestamp: i64,
    },

    /// The dialog targets in effect
    SelectedMultiple { targets: Vec<Target>, timestamp: i64 },

    /// A selection was stored
    SelectionSaved { targets: Vec<Target>, timestamp: i64 },

    /// All selections were forgotten
    SelectionCleared { timestamp: i64 },

    /// Config file written
    ConfigInitialized { path: String, timestamp: i64 },

    /// Something the user should know about that did not stop the command
    Warning { message: String, timestamp: i64 },

    /// The command failed
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl OutputEvent {
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn device(device: &Device) -> Self {
        let compatibility = device.launch_compatibility();
        Self::Device {
            name: device.name().to_string(),
            key: device.key().to_persisted(),
            kind: if device.is_virtual() { "virtual" } else { "physical" },
            device_type: device.device_type(),
            connected_since: device.connection_time().map(|t| t.to_rfc3339()),
            compatibility: compatibility.state,
            compatibility_reason: compatibility.reason.clone(),
            validity_reason: device.validity_reason().map(String::from),
            snapshots: device
                .snapshots()
                .iter()
                .map(|s| SnapshotInfo {
                    path: s.path().display().to_string(),
                    name: s.display_name().to_string(),
                })
                .collect(),
        }
    }

    pub fn no_devices() -> Self {
        Self::NoDevices {
            timestamp: Self::now(),
        }
    }

    /// `devices` is used to name the device behind the target
    pub fn selected(target: Option<Target>, devices: &[Device]) -> Self {
        let device = target
            .as_ref()
            .and_then(|t| devices.iter().find(|d| t.matches(d) || d.matches(t.key())))
            .map(|d| d.name().to_string());
        Self::Selected {
            target,
            device,
            timestamp: Self::now(),
        }
    }

    pub fn selected_multiple(targets: Vec<Target>) -> Self {
        Self::SelectedMultiple {
            targets,
            timestamp: Self::now(),
        }
    }

    pub fn selection_saved(targets: Vec<Target>) -> Self {
        Self::SelectionSaved {
            targets,
            timestamp: Self::now(),
        }
    }

    pub fn selection_cleared() -> Self {
        Self::SelectionCleared {
            timestamp: Self::now(),
        }
    }

    pub fn config_initialized(path: impl Into<String>) -> Self {
        Self::ConfigInitialized {
            path: path.into(),
            timestamp: Self::now(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            timestamp: Self::now(),
        }
    }

    pub fn error(message: impl Into<String>, fatal: bool) -> Self {
        Self::Error {
            message: message.into(),
            fatal,
            timestamp: Self::now(),
        }
    }

    /// Human-readable rendering
    pub fn to_text(&self) -> String {
        match self {
            Self::Device {
                name,
                key,
                kind,
                device_type,
                connected_since,
                compatibility,
                compatibility_reason,
                validity_reason,
                snapshots,
            } => {
                let mut text = format!("{} ({} {})\n  key: {}", name, kind, device_type, key);
                match connected_since {
                    Some(since) => text.push_str(&format!("\n  connected since {}", since)),
                    None => text.push_str("\n  not connected"),
                }
                if *compatibility != LaunchCompatibilityState::Yes {
                    text.push_str(&format!(
                        "\n  {:?}: {}",
                        compatibility,
                        compatibility_reason.as_deref().unwrap_or("-")
                    ));
                }
                if let Some(reason) = validity_reason {
                    text.push_str(&format!("\n  invalid: {}", reason));
                }
                if !snapshots.is_empty() {
                    let names: Vec<&str> = snapshots.iter().map(|s| s.name.as_str()).collect();
                    text.push_str(&format!("\n  snapshots: {}", names.join(", ")));
                }
                text
            }
            Self::NoDevices { .. } => "No devices".to_string(),
            Self::Selected { target: None, .. } => "No target selected".to_string(),
            Self::Selected {
                target: Some(target),
                device,
                ..
            } => match device {
                Some(device) => format!("{} [{}]", target_text(target, device), target.key()),
                None => target.to_string(),
            },
            Self::SelectedMultiple { targets, .. } if targets.is_empty() => {
                "No targets selected".to_string()
            }
            Self::SelectedMultiple { targets, .. } => targets
                .iter()
                .map(|t| format!("{} [{}]", t, t.key()))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::SelectionSaved { targets, .. } => match targets.as_slice() {
                [] => "Selection saved".to_string(),
                [target] => format!("Selected {}", target),
                _ => format!("Selected {} targets", targets.len()),
            },
            Self::SelectionCleared { .. } => "Selection cleared".to_string(),
            Self::ConfigInitialized { path, .. } => format!("Config written to {}", path),
            Self::Warning { message, .. } => format!("warning: {}", message),
            Self::Error { message, .. } => format!("error: {}", message),
        }
    }
}

fn target_text(target: &Target, device: &str) -> String {
    format!("{} ({})", device, target.boot_mode())
}

/// Where events go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }

    /// Write one event to stdout (warnings and errors to stderr in text mode)
    pub fn emit(&self, event: &OutputEvent) {
        let line = match self {
            OutputMode::Json => match serde_json::to_string(event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize output event: {}", e);
                    return;
                }
            },
            OutputMode::Text => event.to_text(),
        };

        let to_stderr = *self == OutputMode::Text
            && matches!(event, OutputEvent::Warning { .. } | OutputEvent::Error { .. });
        let result = if to_stderr {
            writeln!(io::stderr().lock(), "{}", line)
        } else {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", line).and_then(|_| stdout.flush())
        };

        if let Err(e) = result {
            error!("Failed to write output: {}", e);
        }
    }
}
