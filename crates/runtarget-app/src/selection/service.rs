//! The selection boundary used by callers
//!
//! Combo-box reads resolve the stored record against a device list and only
//! write when the stored combo-box device vanished and a replacement was
//! picked. A failed write there is logged and the replacement is still
//! returned. Dialog reads never write. Every write goes through
//! [`SelectionStore::update`].

use runtarget_core::prelude::*;
use runtarget_core::{Device, Target};

use super::clock::{Clock, SystemClock};
use super::reading::TargetsForReading;
use super::state::SelectedState;
use super::store::SelectionStore;
use super::update::SelectionUpdate;

pub struct DevicesSelectedService<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: SelectionStore> DevicesSelectedService<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: SelectionStore, C: Clock> DevicesSelectedService<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve both selection modes against `devices`, storing the
    /// replacement when the combo-box device vanished
    pub fn targets_for_reading(&self, devices: &[Device]) -> TargetsForReading {
        let state = self.store.load();
        let reading = TargetsForReading::new(devices, &state);

        if let Some(replacement) = reading.replacement() {
            info!("Selected device is gone, switching to {}", replacement);
            let update = SelectionUpdate::ReplaceComboBoxTarget {
                replaced: state.target_selected_with_combo_box,
                replacement: replacement.clone(),
                time: self.clock.now(),
            };
            match self.store.update(&update) {
                Ok(true) => {}
                Ok(false) => debug!("Selection changed meanwhile, replacement not stored"),
                Err(e) => warn!("Failed to persist replacement selection: {}", e),
            }
        }

        reading
    }

    /// The target the combo box shows; `None` when there are no devices
    pub fn get_target_selected_with_combo_box(&self, devices: &[Device]) -> Option<Target> {
        self.targets_for_reading(devices)
            .effective_drop_down_target()
            .cloned()
    }

    /// Record a combo-box choice (`None` clears it)
    pub fn set_target_selected_with_combo_box(&self, target: Option<Target>) -> Result<()> {
        debug!("Combo-box selection: {:?}", target);
        let update = SelectionUpdate::SetComboBoxTarget {
            target,
            time: self.clock.now(),
        };
        if !self.store.update(&update)? {
            trace!("Combo-box selection unchanged");
        }
        Ok(())
    }

    /// Dialog targets whose devices are still listed
    ///
    /// Read-only: a vanished combo-box device is not replaced here.
    pub fn get_targets_selected_with_dialog(&self, devices: &[Device]) -> Vec<Target> {
        TargetsForReading::new(devices, &self.store.load())
            .dialog_targets()
            .to_vec()
    }

    /// Record the dialog choice
    pub fn set_targets_selected_with_dialog(&self, targets: Vec<Target>) -> Result<()> {
        debug!("Dialog selection: {} targets", targets.len());
        self.store.update(&SelectionUpdate::SetDialogTargets {
            targets,
            time: self.clock.now(),
        })?;
        Ok(())
    }

    pub fn is_multiple_devices_selected_in_combo_box(&self) -> bool {
        self.store.load().multiple_devices_selected_in_combo_box
    }

    pub fn set_multiple_devices_selected_in_combo_box(&self, selected: bool) -> Result<()> {
        self.store
            .update(&SelectionUpdate::SetMultipleDevicesSelected(selected))?;
        Ok(())
    }

    /// The raw stored record
    pub fn selected_state(&self) -> SelectedState {
        self.store.load()
    }

    /// Forget every stored selection
    pub fn clear(&self) -> Result<()> {
        info!("Clearing stored selection");
        self.store.update(&SelectionUpdate::Clear)?;
        Ok(())
    }
}
