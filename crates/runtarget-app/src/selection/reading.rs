//! Resolving stored selections against the current device list
//!
//! Everything here is a pure function of `(devices, stored record)`. The one
//! case that implies a write (the combo-box device vanished and a
//! replacement was picked) is reported through
//! [`TargetsForReading::replacement`] for the caller to persist.

use chrono::{DateTime, Utc};
use runtarget_core::{first_valid_device, Device, Target};

use super::state::SelectedState;

/// Target for the top-ranked valid device, if there is one
pub fn default_target(devices: &[Device]) -> Option<Target> {
    first_valid_device(devices).map(Device::default_target)
}

/// Resolve one stored target selected at `selected_at`
///
/// Returns `None` when no device matches the target's key.
pub fn resolve_target(
    target: &Target,
    selected_at: DateTime<Utc>,
    devices: &[Device],
) -> Option<Target> {
    let device = devices.iter().find(|d| d.matches(target.key()))?;

    match device.connection_time() {
        // The device came up after the choice: it is the running instance now
        Some(connected_at) if connected_at > selected_at => {
            Some(Target::running_device(target.key().clone()))
        }
        None if target.is_running_device() => Some(device.default_target()),
        _ => Some(target.clone()),
    }
}

/// The selections in effect for one device list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetsForReading {
    drop_down_target: Option<Target>,
    drop_down_running_device_target: Option<Target>,
    dialog_targets: Vec<Target>,
    replacement: Option<Target>,
}

impl TargetsForReading {
    pub fn new(devices: &[Device], state: &SelectedState) -> Self {
        if devices.is_empty() {
            return Self {
                drop_down_target: None,
                drop_down_running_device_target: None,
                dialog_targets: Vec::new(),
                replacement: None,
            };
        }

        let drop_down_running_device_target = state
            .running_device_target_selected_with_combo_box
            .as_ref()
            .filter(|running| devices.iter().any(|d| running.matches(d)))
            .cloned();

        let (drop_down_target, replacement) = match &state.target_selected_with_combo_box {
            None => (default_target(devices), None),
            Some(target) => match resolve_target(
                target,
                state.time_target_was_selected_with_combo_box,
                devices,
            ) {
                Some(resolved) => (Some(resolved), None),
                None => {
                    let fallback = default_target(devices);
                    (fallback.clone(), fallback)
                }
            },
        };

        let mut dialog_targets: Vec<Target> = Vec::new();
        for target in &state.targets_selected_with_dialog {
            if let Some(resolved) =
                resolve_target(target, state.time_targets_were_selected_with_dialog, devices)
            {
                if !dialog_targets.contains(&resolved) {
                    dialog_targets.push(resolved);
                }
            }
        }

        Self {
            drop_down_target,
            drop_down_running_device_target,
            dialog_targets,
            replacement,
        }
    }

    /// The combo-box target resolved from the stored intent
    pub fn drop_down_target(&self) -> Option<&Target> {
        self.drop_down_target.as_ref()
    }

    /// The stored running-device target, while a connected device satisfies it
    pub fn drop_down_running_device_target(&self) -> Option<&Target> {
        self.drop_down_running_device_target.as_ref()
    }

    /// What the combo box shows: the running instance when there is one
    pub fn effective_drop_down_target(&self) -> Option<&Target> {
        self.drop_down_running_device_target
            .as_ref()
            .or(self.drop_down_target.as_ref())
    }

    /// Dialog targets whose device is still listed
    pub fn dialog_targets(&self) -> &[Target] {
        &self.dialog_targets
    }

    /// New combo-box intent to persist because the stored one vanished
    pub fn replacement(&self) -> Option<&Target> {
        self.replacement.as_ref()
    }
}
