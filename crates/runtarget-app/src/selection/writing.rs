//! Deciding what a new combo-box choice changes in the stored record

use chrono::{DateTime, Utc};
use runtarget_core::Target;

use super::state::SelectedState;

/// How a new choice relates to the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Same target as stored
    Unchanged,
    /// The stored device, picked as the running instance
    SameDeviceNowRunning,
    /// A different device or a different boot mode
    NewTarget,
    /// Nothing selected
    Cleared,
}

/// The two derived views to write for one combo-box choice
///
/// At most one of them is populated: a running-instance choice for the
/// stored device only replaces the running view, so the boot-mode intent
/// survives the emulator stopping again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetsForWriting {
    transition: Transition,
    drop_down_target: Option<Target>,
    drop_down_running_device_target: Option<Target>,
}

impl TargetsForWriting {
    /// `old` is the stored intent, `running` the stored running view
    pub fn new(old: Option<&Target>, running: Option<&Target>, new: Option<Target>) -> Self {
        let Some(new) = new else {
            let transition = if old.is_none() && running.is_none() {
                Transition::Unchanged
            } else {
                Transition::Cleared
            };
            return Self::with(transition, None, None);
        };

        if running == Some(&new) || (running.is_none() && old == Some(&new)) {
            return Self::with(Transition::Unchanged, None, None);
        }

        match old {
            Some(old) if new.is_running_device() && old.key() == new.key() => {
                Self::with(Transition::SameDeviceNowRunning, None, Some(new))
            }
            _ => Self::with(Transition::NewTarget, Some(new), None),
        }
    }

    fn with(
        transition: Transition,
        drop_down_target: Option<Target>,
        drop_down_running_device_target: Option<Target>,
    ) -> Self {
        Self {
            transition,
            drop_down_target,
            drop_down_running_device_target,
        }
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    /// New boot-mode intent, when the intent changes
    pub fn drop_down_target(&self) -> Option<&Target> {
        self.drop_down_target.as_ref()
    }

    /// New running view, when only the running view changes
    pub fn drop_down_running_device_target(&self) -> Option<&Target> {
        self.drop_down_running_device_target.as_ref()
    }

    /// Apply to `state`; returns whether anything changed
    ///
    /// Only a new intent (or clearing) moves the selection time, which is
    /// what later connections are compared against.
    pub fn apply(self, state: &mut SelectedState, now: DateTime<Utc>) -> bool {
        match self.transition {
            Transition::Unchanged => false,
            Transition::Cleared => {
                state.target_selected_with_combo_box = None;
                state.running_device_target_selected_with_combo_box = None;
                state.time_target_was_selected_with_combo_box = now;
                true
            }
            Transition::SameDeviceNowRunning => {
                state.running_device_target_selected_with_combo_box =
                    self.drop_down_running_device_target;
                true
            }
            Transition::NewTarget => {
                state.target_selected_with_combo_box = self.drop_down_target;
                state.running_device_target_selected_with_combo_box = None;
                state.time_target_was_selected_with_combo_box = now;
                true
            }
        }
    }
}
