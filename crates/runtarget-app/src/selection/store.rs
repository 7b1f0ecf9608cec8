//! Persistence boundary for the selected-state record

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use runtarget_core::prelude::*;

use super::state::SelectedState;
use super::update::SelectionUpdate;

/// Loads the selected-state record and applies changes to it
#[cfg_attr(test, mockall::automock)]
pub trait SelectionStore: Send + Sync {
    /// Current record; unreadable state reads as the default record
    fn load(&self) -> SelectedState;

    /// Apply `update` to the current record and store the result
    ///
    /// The record is read, changed and written as one step. Returns whether
    /// anything changed; nothing is written otherwise.
    fn update(&self, update: &SelectionUpdate) -> Result<bool>;
}

/// Record kept in a TOML file
///
/// An exclusive lock on a sibling `.lock` file is held from reading the
/// record until the new one is renamed over it, so two processes never
/// interleave their changes.
#[derive(Debug, Clone)]
pub struct TomlSelectionStore {
    path: PathBuf,
}

impl TomlSelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    /// Take the write lock; it is released when the returned file drops
    fn lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::store(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let lock_path = self.sibling(".lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| Error::store(format!("Failed to open {}: {}", lock_path.display(), e)))?;

        lock_file.try_lock_exclusive().map_err(|_| Error::StateLocked {
            path: self.path.clone(),
        })?;
        Ok(lock_file)
    }

    /// Replace the record; the caller holds the lock
    fn write(&self, state: &SelectedState) -> Result<()> {
        let content = state.to_toml()?;
        let temp_path = self.sibling(".tmp");

        std::fs::write(&temp_path, content)
            .map_err(|e| Error::store(format!("Failed to write temp file: {}", e)))?;
        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| Error::store(format!("Failed to rename temp file: {}", e)))?;

        debug!("Saved selection state to {:?}", self.path);
        Ok(())
    }
}

impl SelectionStore for TomlSelectionStore {
    fn load(&self) -> SelectedState {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => SelectedState::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No selection state at {:?}", self.path);
                SelectedState::default()
            }
            Err(e) => {
                warn!("Failed to read {:?}: {}", self.path, e);
                SelectedState::default()
            }
        }
    }

    fn update(&self, update: &SelectionUpdate) -> Result<bool> {
        let _lock = self.lock()?;

        let mut state = self.load();
        if !update.apply(&mut state) {
            trace!("Selection unchanged by {:?}", update);
            return Ok(false);
        }
        self.write(&state)?;
        Ok(true)
    }
}

/// Record kept in memory, for one-shot use and tests
#[derive(Debug, Default)]
pub struct MemorySelectionStore {
    state: Mutex<SelectedState>,
}

impl MemorySelectionStore {
    pub fn new(state: SelectedState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl SelectionStore for MemorySelectionStore {
    fn load(&self) -> SelectedState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn update(&self, update: &SelectionUpdate) -> Result<bool> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(update.apply(&mut state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtarget_core::test_utils::test_time;
    use runtarget_core::{Key, Target};
    use tempfile::tempdir;

    fn pixel() -> Target {
        Target::quick_boot(Key::virtual_device_path("/avd/Pixel_6.avd"))
    }

    fn select_pixel() -> SelectionUpdate {
        SelectionUpdate::SetComboBoxTarget {
            target: Some(pixel()),
            time: test_time(9),
        }
    }

    fn hold_lock(path: &Path) -> File {
        let holder = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .unwrap();
        holder.lock_exclusive().unwrap();
        holder
    }

    #[test]
    fn test_missing_file_loads_default() {
        let temp = tempdir().unwrap();
        let store = TomlSelectionStore::new(temp.path().join("selection.toml"));
        assert_eq!(store.load(), SelectedState::default());
    }

    #[test]
    fn test_update_then_load() {
        let temp = tempdir().unwrap();
        let store = TomlSelectionStore::new(temp.path().join(".runtarget").join("selection.toml"));

        assert!(store.update(&select_pixel()).unwrap());
        let state = store.load();
        assert_eq!(state.target_selected_with_combo_box, Some(pixel()));
        assert_eq!(state.time_target_was_selected_with_combo_box, test_time(9));
        assert!(!temp.path().join(".runtarget/selection.toml.tmp").exists());
    }

    #[test]
    fn test_unchanged_update_does_not_write() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("selection.toml");
        let store = TomlSelectionStore::new(&path);

        assert!(!store.update(&SelectionUpdate::Clear).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_update_while_locked_fails() {
        let temp = tempdir().unwrap();
        let store = TomlSelectionStore::new(temp.path().join("selection.toml"));

        let holder = hold_lock(&temp.path().join("selection.toml.lock"));

        let result = store.update(&select_pixel());
        assert!(matches!(result, Err(Error::StateLocked { .. })));
        assert!(result.unwrap_err().is_recoverable());
        assert_eq!(store.load(), SelectedState::default());

        holder.unlock().unwrap();
        assert!(store.update(&select_pixel()).unwrap());
    }

    #[test]
    fn test_update_applies_to_record_written_by_other_store() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("selection.toml");
        let first = TomlSelectionStore::new(&path);
        let second = TomlSelectionStore::new(&path);

        // `second` read the record before `first` wrote its choice
        let stale = second.load();
        first.update(&select_pixel()).unwrap();

        let replaced = second
            .update(&SelectionUpdate::ReplaceComboBoxTarget {
                replaced: stale.target_selected_with_combo_box,
                replacement: Target::cold_boot(Key::serial_number("R58M123")),
                time: test_time(10),
            })
            .unwrap();
        assert!(!replaced);

        second
            .update(&SelectionUpdate::SetMultipleDevicesSelected(true))
            .unwrap();
        let state = first.load();
        assert_eq!(state.target_selected_with_combo_box, Some(pixel()));
        assert!(state.multiple_devices_selected_in_combo_box);
    }

    #[test]
    fn test_corrupt_file_loads_default() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("selection.toml");
        std::fs::write(&path, "\u{0}\u{1}garbage = = =").unwrap();

        assert_eq!(TomlSelectionStore::new(path).load(), SelectedState::default());
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySelectionStore::default();
        assert!(store.update(&select_pixel()).unwrap());
        assert!(!store.update(&select_pixel()).unwrap());
        assert_eq!(store.load().target_selected_with_combo_box, Some(pixel()));
    }
}
