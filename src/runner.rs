//! Command execution over discovery and the selection service

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use runtarget_app::{
    connection_times_path, load_settings, selection_state_path, DevicesSelectedService,
    SelectionStore, TomlSelectionStore,
};
use runtarget_core::prelude::*;
use runtarget_core::{Device, Key, Target};
use runtarget_discovery::{
    AdbDeviceSource, AndroidDevicesTask, AvdDirectorySource, ConnectedDeviceSource,
    ConnectionTimes, DeviceRefresher, DevicesTask, VirtualDeviceSource, DEFAULT_POLL_INTERVAL,
};

use crate::cli::{canonical_key, BootMode};
use crate::output::OutputEvent;

/// Runner wired to the local SDK and the project's selection file
pub type AndroidRunner = Runner<AvdDirectorySource, AdbDeviceSource, TomlSelectionStore>;

pub struct Runner<V, C, S> {
    refresher: DeviceRefresher<V, C>,
    service: DevicesSelectedService<S>,
    poll_interval: Duration,
}

impl AndroidRunner {
    /// Build a runner from `.runtarget/config.toml` in `project_path`
    pub fn for_project(project_path: &Path, emit: &mut impl FnMut(OutputEvent)) -> Result<Self> {
        let settings = load_settings(project_path);
        settings.validate()?;

        let locations = settings.discovery.sdk_locations();
        if let Err(e) = locations.require_adb() {
            warn!("{}", e);
            emit(OutputEvent::warning(format!(
                "{} Only AVDs will be listed.",
                e
            )));
        }

        let connection_times =
            ConnectionTimes::persistent(connection_times_path(project_path, &settings));
        let task = AndroidDevicesTask::android(locations, connection_times)
            .with_timeout(settings.discovery.timeout());
        let store = TomlSelectionStore::new(selection_state_path(project_path, &settings));
        info!("Selection state: {}", store.path().display());

        Ok(Runner::new(task, store).with_poll_interval(settings.discovery.poll_interval()))
    }
}

impl<V, C, S> Runner<V, C, S>
where
    V: VirtualDeviceSource,
    C: ConnectedDeviceSource + Sync + 'static,
    S: SelectionStore,
{
    pub fn new(task: DevicesTask<V, C>, store: S) -> Self {
        Self {
            refresher: DeviceRefresher::new(task),
            service: DevicesSelectedService::new(store),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn service(&self) -> &DevicesSelectedService<S> {
        &self.service
    }

    async fn devices_now(&self) -> Vec<Device> {
        let snapshot = self.refresher.refresh_now().await;
        debug!(
            "Discovery cycle {} found {} devices",
            snapshot.cycle,
            snapshot.devices.len()
        );
        snapshot.devices.as_ref().clone()
    }

    /// `devices`: every device in presentation order
    pub async fn devices(&self, emit: &mut impl FnMut(OutputEvent)) -> Result<()> {
        let devices = self.devices_now().await;
        if devices.is_empty() {
            emit(OutputEvent::no_devices());
        }
        for device in &devices {
            emit(OutputEvent::device(device));
        }
        Ok(())
    }

    /// `selected`: the target(s) a run would use right now
    ///
    /// In multiple-device mode this is the dialog target set.
    pub async fn selected(&self, emit: &mut impl FnMut(OutputEvent)) -> Result<()> {
        let devices = self.devices_now().await;
        if devices.is_empty() {
            emit(OutputEvent::no_devices());
            return Ok(());
        }
        if self.service.is_multiple_devices_selected_in_combo_box() {
            let targets = self.service.get_targets_selected_with_dialog(&devices);
            emit(OutputEvent::selected_multiple(targets));
        } else {
            let target = self.service.get_target_selected_with_combo_box(&devices);
            emit(OutputEvent::selected(target, &devices));
        }
        Ok(())
    }

    /// `select KEY`: record the single-device choice
    pub async fn select(
        &self,
        key: &Key,
        mode: &BootMode,
        emit: &mut impl FnMut(OutputEvent),
    ) -> Result<()> {
        let devices = self.devices_now().await;
        let key = canonical_key(key, &devices);
        if !devices.iter().any(|d| d.matches(&key)) {
            emit(OutputEvent::warning(format!(
                "No listed device matches {}; it will be selected once it appears",
                key
            )));
        }

        let target = mode.target(key);
        self.service
            .set_target_selected_with_combo_box(Some(target.clone()))?;
        emit(OutputEvent::selection_saved(vec![target]));
        Ok(())
    }

    /// `select-multiple KEY...`: record the multiple-device choice
    ///
    /// Listed devices get their default target; unknown keys get quick boot.
    pub async fn select_multiple(
        &self,
        keys: &[Key],
        emit: &mut impl FnMut(OutputEvent),
    ) -> Result<()> {
        let devices = self.devices_now().await;
        let mut targets = Vec::with_capacity(keys.len());
        for key in keys {
            let key = canonical_key(key, &devices);
            let target = match devices.iter().find(|d| d.matches(&key)) {
                Some(device) => device.default_target(),
                None => {
                    emit(OutputEvent::warning(format!("No listed device matches {}", key)));
                    Target::quick_boot(key)
                }
            };
            targets.push(target);
        }

        self.service.set_targets_selected_with_dialog(targets)?;
        self.service.set_multiple_devices_selected_in_combo_box(true)?;
        let stored = self.service.selected_state().targets_selected_with_dialog;
        emit(OutputEvent::selection_saved(stored));
        Ok(())
    }

    /// `selected-multiple`: the dialog targets in effect
    pub async fn selected_multiple(&self, emit: &mut impl FnMut(OutputEvent)) -> Result<()> {
        let devices = self.devices_now().await;
        let targets = self.service.get_targets_selected_with_dialog(&devices);
        emit(OutputEvent::selected_multiple(targets));
        Ok(())
    }

    /// `clear`: forget every stored selection
    pub fn clear(&self, emit: &mut impl FnMut(OutputEvent)) -> Result<()> {
        self.service.clear()?;
        emit(OutputEvent::selection_cleared());
        Ok(())
    }

    /// `watch`: emit the combo-box target each time it changes
    ///
    /// Polls discovery until `shutdown` resolves.
    pub async fn watch(
        &self,
        emit: &mut impl FnMut(OutputEvent),
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        let mut updates = self.refresher.subscribe();
        let poller = self.refresher.spawn_polling(self.poll_interval);
        info!("Watching devices every {:?}", self.poll_interval);

        tokio::pin!(shutdown);
        let mut last: Option<Option<Target>> = None;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Watch stopped");
                    break;
                }
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let devices = updates.borrow_and_update().devices.clone();
                    let target = self.service.get_target_selected_with_combo_box(&devices);
                    if last.as_ref() != Some(&target) {
                        emit(OutputEvent::selected(target.clone(), &devices));
                        last = Some(target);
                    }
                }
            }
        }

        poller.abort();
        Ok(())
    }
}
