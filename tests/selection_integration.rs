//! Integration tests: AVDs on disk + attached devices -> persisted selection

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use runtarget_app::{DevicesSelectedService, FixedClock, SelectionStore, TomlSelectionStore};
use runtarget_core::test_utils::test_time;
use runtarget_core::{Device, Key, Result, Target};
use runtarget_discovery::{
    AdbDeviceState, AvdDirectorySource, ConnectedDevice, ConnectedDeviceSource, ConnectionTimes,
    DevicesTask, SdkLocations,
};

/// Helper to create `<name>.ini` and its data folder with a config.ini
fn create_avd(home: &Path, name: &str, config: &str) -> PathBuf {
    let data_folder = home.join(format!("{}.avd", name));
    fs::create_dir_all(&data_folder).unwrap();
    fs::write(data_folder.join("config.ini"), config).unwrap();
    fs::write(
        home.join(format!("{}.ini", name)),
        format!("avd.ini.encoding=UTF-8\npath={}\n", data_folder.display()),
    )
    .unwrap();
    fs::canonicalize(data_folder).unwrap()
}

fn varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn length_delimited(field: u64, payload: &[u8], out: &mut Vec<u8>) {
    varint(field << 3 | 2, out);
    varint(payload.len() as u64, out);
    out.extend_from_slice(payload);
}

/// Helper to write `snapshots/<id>/snapshot.pb` with one image and a name
fn create_snapshot(data_folder: &Path, id: &str, logical_name: &str) {
    let mut proto = Vec::new();
    varint(1 << 3, &mut proto);
    varint(4, &mut proto);
    length_delimited(3, &[], &mut proto);
    length_delimited(9, logical_name.as_bytes(), &mut proto);

    let dir = data_folder.join("snapshots").join(id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("snapshot.pb"), proto).unwrap();
}

/// Attached devices, changeable between cycles
#[derive(Clone, Default)]
struct Attached(Arc<Mutex<Vec<ConnectedDevice>>>);

impl Attached {
    fn set(&self, devices: Vec<ConnectedDevice>) {
        *self.0.lock().unwrap() = devices;
    }
}

impl ConnectedDeviceSource for Attached {
    async fn connected_devices(&self) -> Result<Vec<ConnectedDevice>> {
        let devices = self.0.lock().unwrap().clone();
        Ok(devices)
    }
}

fn emulator(serial: &str, avd_name: &str, data_folder: &Path, hour: u32) -> ConnectedDevice {
    let mut device = ConnectedDevice::new(serial, AdbDeviceState::Online);
    device.avd_name = Some(avd_name.to_string());
    device.avd_path = Some(data_folder.to_path_buf());
    device.connection_time = Some(test_time(hour));
    device
}

fn phone(serial: &str, hour: u32) -> ConnectedDevice {
    let mut device = ConnectedDevice::new(serial, AdbDeviceState::Online);
    device.manufacturer = Some("samsung".to_string());
    device.model = Some("SM-G991B".to_string());
    device.connection_time = Some(test_time(hour));
    device
}

struct Fixture {
    _dir: TempDir,
    avd_home: PathBuf,
    state_path: PathBuf,
    attached: Attached,
    task: DevicesTask<AvdDirectorySource, Attached>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let avd_home = dir.path().join("avd");
        fs::create_dir_all(&avd_home).unwrap();
        let state_path = dir.path().join(".runtarget").join("selection.toml");

        let locations = SdkLocations {
            avd_home: avd_home.clone(),
            ..Default::default()
        };
        let attached = Attached::default();
        let task = DevicesTask::new(AvdDirectorySource::new(locations), attached.clone());

        Self {
            _dir: dir,
            avd_home,
            state_path,
            attached,
            task,
        }
    }

    fn service(&self, hour: u32) -> DevicesSelectedService<TomlSelectionStore, FixedClock> {
        DevicesSelectedService::with_clock(
            TomlSelectionStore::new(&self.state_path),
            FixedClock::new(test_time(hour)),
        )
    }

    async fn devices(&self) -> Vec<Device> {
        let mut devices = self.task.collect().await;
        runtarget_core::sort_devices(&mut devices);
        devices
    }
}

#[tokio::test]
async fn test_no_devices_selects_nothing() {
    let fixture = Fixture::new();
    let devices = fixture.devices().await;
    assert!(devices.is_empty());

    let service = fixture.service(9);
    assert_eq!(service.get_target_selected_with_combo_box(&devices), None);
    assert!(!fixture.state_path.exists());
}

#[tokio::test]
async fn test_single_avd_default_pick_is_not_persisted() {
    let fixture = Fixture::new();
    let pixel = create_avd(&fixture.avd_home, "Pixel_6", "avd.ini.displayname=Pixel 6\n");

    let devices = fixture.devices().await;
    let service = fixture.service(9);
    assert_eq!(
        service.get_target_selected_with_combo_box(&devices),
        Some(Target::quick_boot(Key::virtual_device_path(&pixel)))
    );
    assert!(!fixture.state_path.exists());
}

#[tokio::test]
async fn test_emulator_started_after_selection_is_running_target() {
    let fixture = Fixture::new();
    let pixel = create_avd(&fixture.avd_home, "Pixel_6", "avd.ini.displayname=Pixel 6\n");
    let key = Key::virtual_device_path(&pixel);

    fixture
        .service(9)
        .set_target_selected_with_combo_box(Some(Target::quick_boot(key.clone())))
        .unwrap();

    fixture
        .attached
        .set(vec![emulator("emulator-5554", "Pixel_6", &pixel, 10)]);
    let devices = fixture.devices().await;
    assert_eq!(devices.len(), 1, "emulator folds into its AVD");

    // A fresh service reads the record back from disk
    let service = fixture.service(11);
    assert_eq!(
        service.get_target_selected_with_combo_box(&devices),
        Some(Target::running_device(key.clone()))
    );
    assert_eq!(
        service.store().load().target_selected_with_combo_box,
        Some(Target::quick_boot(key))
    );
}

#[tokio::test]
async fn test_vanished_device_is_replaced_on_disk() {
    let fixture = Fixture::new();
    create_avd(&fixture.avd_home, "Pixel_6", "avd.ini.displayname=Pixel 6\n");

    fixture
        .service(8)
        .set_target_selected_with_combo_box(Some(Target::running_device(Key::serial_number(
            "R58M123",
        ))))
        .unwrap();

    // The phone is unplugged, another one is attached
    fixture.attached.set(vec![phone("HT7A1", 9)]);
    let devices = fixture.devices().await;

    let service = fixture.service(12);
    let expected = Target::running_device(Key::serial_number("HT7A1"));
    assert_eq!(
        service.get_target_selected_with_combo_box(&devices),
        Some(expected.clone())
    );

    let stored = TomlSelectionStore::new(&fixture.state_path).load();
    assert_eq!(stored.target_selected_with_combo_box, Some(expected));
    assert_eq!(stored.time_target_was_selected_with_combo_box, test_time(12));
}

#[tokio::test]
async fn test_dialog_targets_with_snapshot_survive_restart() {
    let fixture = Fixture::new();
    let pixel = create_avd(&fixture.avd_home, "Pixel_6", "avd.ini.displayname=Pixel 6\n");
    create_snapshot(&pixel, "snap_2024-05-01", "Logged in");
    fixture.attached.set(vec![phone("R58M123", 7)]);

    let devices = fixture.devices().await;
    let snapshots: Vec<&str> = devices
        .iter()
        .find(|d| d.is_virtual())
        .map(|d| d.snapshots().iter().map(|s| s.display_name()).collect())
        .unwrap_or_default();
    assert_eq!(snapshots, vec!["Quickboot", "Logged in"]);

    let pixel_target =
        Target::boot_with_snapshot(Key::virtual_device_path(&pixel), "snap_2024-05-01");
    let phone_target = Target::running_device(Key::serial_number("R58M123"));
    fixture
        .service(9)
        .set_targets_selected_with_dialog(vec![pixel_target.clone(), phone_target.clone()])
        .unwrap();

    let service = fixture.service(10);
    assert_eq!(
        service.get_targets_selected_with_dialog(&devices),
        vec![pixel_target.clone(), phone_target]
    );

    // Without the phone only the emulator target remains
    fixture.attached.set(Vec::new());
    let devices = fixture.devices().await;
    assert_eq!(
        service.get_targets_selected_with_dialog(&devices),
        vec![pixel_target]
    );
}

#[tokio::test]
async fn test_unreadable_state_file_reads_as_empty() {
    let fixture = Fixture::new();
    let pixel = create_avd(&fixture.avd_home, "Pixel_6", "");
    fs::create_dir_all(fixture.state_path.parent().unwrap()).unwrap();
    fs::write(&fixture.state_path, "this is [not toml").unwrap();

    let devices = fixture.devices().await;
    let service = fixture.service(9);
    assert_eq!(
        service.get_target_selected_with_combo_box(&devices),
        Some(Target::quick_boot(Key::virtual_device_path(&pixel)))
    );
}

/// One process's view of attached emulators, stamped like the adb source does
struct Invocation {
    times: ConnectionTimes,
    listed_hour: u32,
    emulators: Vec<(String, String, PathBuf)>,
}

impl ConnectedDeviceSource for Invocation {
    async fn connected_devices(&self) -> Result<Vec<ConnectedDevice>> {
        let times = self.times.observe(
            self.emulators.iter().map(|(serial, _, _)| serial.as_str()),
            test_time(self.listed_hour),
        );
        Ok(self
            .emulators
            .iter()
            .map(|(serial, avd_name, data_folder)| {
                let mut device = ConnectedDevice::new(serial, AdbDeviceState::Online);
                device.avd_name = Some(avd_name.clone());
                device.avd_path = Some(data_folder.clone());
                device.connection_time = times.get(serial).copied();
                device
            })
            .collect())
    }
}

#[tokio::test]
async fn test_emulator_running_before_selection_is_not_promoted_in_later_run() {
    let fixture = Fixture::new();
    let pixel = create_avd(&fixture.avd_home, "Pixel_6", "avd.ini.displayname=Pixel 6\n");
    let key = Key::virtual_device_path(&pixel);
    let times_path = fixture.state_path.with_file_name("connections.toml");
    let locations = SdkLocations {
        avd_home: fixture.avd_home.clone(),
        ..Default::default()
    };
    // Every run builds its own sources, as separate processes would
    let run = |listed_hour: u32, emulator_attached: bool| {
        let emulators = if emulator_attached {
            vec![("emulator-5554".to_string(), "Pixel_6".to_string(), pixel.clone())]
        } else {
            Vec::new()
        };
        DevicesTask::new(
            AvdDirectorySource::new(locations.clone()),
            Invocation {
                times: ConnectionTimes::persistent(&times_path),
                listed_hour,
                emulators,
            },
        )
    };

    // First run lists the emulator, already booted, then the user picks a cold boot
    let devices = run(8, true).collect().await;
    assert_eq!(devices[0].connection_time(), Some(test_time(8)));
    fixture
        .service(9)
        .set_target_selected_with_combo_box(Some(Target::cold_boot(key.clone())))
        .unwrap();

    // A later run still sees the emulator connected since before the choice
    let devices = run(10, true).collect().await;
    assert_eq!(devices[0].connection_time(), Some(test_time(8)));
    assert_eq!(
        fixture.service(10).get_target_selected_with_combo_box(&devices),
        Some(Target::cold_boot(key.clone()))
    );

    // Restarted after the choice: now the running instance is the target
    let devices = run(12, false).collect().await;
    assert_eq!(devices[0].connection_time(), None);
    let devices = run(13, true).collect().await;
    assert_eq!(devices[0].connection_time(), Some(test_time(13)));
    assert_eq!(
        fixture.service(13).get_target_selected_with_combo_box(&devices),
        Some(Target::running_device(key))
    );
}
