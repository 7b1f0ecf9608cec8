//! The persisted selected-state record
//!
//! Stored as TOML. Reading is tolerant: a target table that does not decode
//! is dropped with a warning, a file that does not parse at all is treated as
//! no state. Keys go through [`runtarget_core::Key::from_persisted`], so
//! untagged legacy tokens survive as `NonprefixedKey`.

use chrono::{DateTime, Utc};
use runtarget_core::prelude::*;
use runtarget_core::Target;
use serde::{Deserialize, Serialize};

/// What the user last chose, in both selection modes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedState {
    pub time_targets_were_selected_with_dialog: DateTime<Utc>,
    pub time_target_was_selected_with_combo_box: DateTime<Utc>,
    pub multiple_devices_selected_in_combo_box: bool,

    /// Boot-mode intent chosen in the combo box
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_selected_with_combo_box: Option<Target>,

    /// Running instance of the combo-box device, shown instead of the intent
    /// while that device is connected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_device_target_selected_with_combo_box: Option<Target>,

    /// Targets chosen in the multiple-devices dialog, without duplicates
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets_selected_with_dialog: Vec<Target>,
}

impl Default for SelectedState {
    fn default() -> Self {
        Self {
            time_targets_were_selected_with_dialog: DateTime::<Utc>::UNIX_EPOCH,
            time_target_was_selected_with_combo_box: DateTime::<Utc>::UNIX_EPOCH,
            multiple_devices_selected_in_combo_box: false,
            target_selected_with_combo_box: None,
            running_device_target_selected_with_combo_box: None,
            targets_selected_with_dialog: Vec::new(),
        }
    }
}

/// On-disk shape with targets left undecoded
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSelectedState {
    time_targets_were_selected_with_dialog: Option<DateTime<Utc>>,
    time_target_was_selected_with_combo_box: Option<DateTime<Utc>>,
    multiple_devices_selected_in_combo_box: bool,
    target_selected_with_combo_box: Option<toml::Value>,
    running_device_target_selected_with_combo_box: Option<toml::Value>,
    targets_selected_with_dialog: Vec<toml::Value>,
}

impl SelectedState {
    /// Decode a stored record
    ///
    /// Never fails; whatever cannot be read is treated as absent.
    pub fn from_toml(content: &str) -> Self {
        let raw: RawSelectedState = match toml::from_str(content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Ignoring unreadable selection state: {}", e);
                return Self::default();
            }
        };

        let mut targets = Vec::new();
        for value in raw.targets_selected_with_dialog {
            if let Some(target) = decode_target(value, "targets_selected_with_dialog") {
                push_unique(&mut targets, target);
            }
        }

        Self {
            time_targets_were_selected_with_dialog: raw
                .time_targets_were_selected_with_dialog
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            time_target_was_selected_with_combo_box: raw
                .time_target_was_selected_with_combo_box
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            multiple_devices_selected_in_combo_box: raw.multiple_devices_selected_in_combo_box,
            target_selected_with_combo_box: raw
                .target_selected_with_combo_box
                .and_then(|v| decode_target(v, "target_selected_with_combo_box")),
            running_device_target_selected_with_combo_box: raw
                .running_device_target_selected_with_combo_box
                .and_then(|v| decode_target(v, "running_device_target_selected_with_combo_box")),
            targets_selected_with_dialog: targets,
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::store(format!("Failed to serialize selection state: {}", e)))
    }

    /// Replace the dialog targets, dropping duplicates
    pub fn set_targets_selected_with_dialog(
        &mut self,
        targets: impl IntoIterator<Item = Target>,
        time: DateTime<Utc>,
    ) {
        let mut unique = Vec::new();
        for target in targets {
            push_unique(&mut unique, target);
        }
        self.targets_selected_with_dialog = unique;
        self.time_targets_were_selected_with_dialog = time;
    }
}

fn decode_target(value: toml::Value, field: &str) -> Option<Target> {
    Target::deserialize(value)
        .inspect_err(|e| warn!("Dropping unreadable target in {}: {}", field, e))
        .ok()
}

fn push_unique(targets: &mut Vec<Target>, target: Target) {
    if !targets.contains(&target) {
        targets.push(target);
    }
}
