//! Changes to the selected-state record
//!
//! Every write is a [`SelectionUpdate`] applied to the record as it is on
//! disk at the time of the write, so a store can hold its lock from the read
//! through the write.

use chrono::{DateTime, Utc};
use runtarget_core::Target;

use super::state::SelectedState;
use super::writing::{TargetsForWriting, Transition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionUpdate {
    /// The combo-box device vanished and `replacement` was picked
    ///
    /// Only applies while the stored intent is still `replaced`; a choice
    /// made in the meantime wins.
    ReplaceComboBoxTarget {
        replaced: Option<Target>,
        replacement: Target,
        time: DateTime<Utc>,
    },

    /// A combo-box choice; `None` clears it
    SetComboBoxTarget {
        target: Option<Target>,
        time: DateTime<Utc>,
    },

    SetDialogTargets {
        targets: Vec<Target>,
        time: DateTime<Utc>,
    },

    SetMultipleDevicesSelected(bool),

    /// Forget every stored selection
    Clear,
}

impl SelectionUpdate {
    /// Apply to `state`; returns whether anything changed
    pub fn apply(&self, state: &mut SelectedState) -> bool {
        match self {
            Self::ReplaceComboBoxTarget {
                replaced,
                replacement,
                time,
            } => {
                if state.target_selected_with_combo_box != *replaced {
                    return false;
                }
                state.target_selected_with_combo_box = Some(replacement.clone());
                state.running_device_target_selected_with_combo_box = None;
                state.time_target_was_selected_with_combo_box = *time;
                true
            }
            Self::SetComboBoxTarget { target, time } => {
                let writing = TargetsForWriting::new(
                    state.target_selected_with_combo_box.as_ref(),
                    state.running_device_target_selected_with_combo_box.as_ref(),
                    target.clone(),
                );
                let transition = writing.transition();
                if !writing.apply(state, *time) {
                    return false;
                }
                if transition != Transition::Cleared {
                    state.multiple_devices_selected_in_combo_box = false;
                }
                true
            }
            Self::SetDialogTargets { targets, time } => {
                state.set_targets_selected_with_dialog(targets.iter().cloned(), *time);
                true
            }
            Self::SetMultipleDevicesSelected(selected) => {
                if state.multiple_devices_selected_in_combo_box == *selected {
                    return false;
                }
                state.multiple_devices_selected_in_combo_box = *selected;
                true
            }
            Self::Clear => {
                if *state == SelectedState::default() {
                    return false;
                }
                *state = SelectedState::default();
                true
            }
        }
    }
}
