//! First-seen times of connected devices
//!
//! adb does not report when a device came online, so the time a serial number
//! is first observed online stands in for it. A serial that drops out of a
//! listing is forgotten; when it comes back it gets a fresh time.
//!
//! With a backing file the record outlives the process, so a device that
//! stays connected across separate invocations keeps its first-seen time.
//! Listings taken before the last applied one are stale and change nothing.

use std::collections::{BTreeMap, HashMap};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use runtarget_core::prelude::*;
use serde::{Deserialize, Serialize};

/// The persisted form: when the last applied listing was taken and the
/// first-seen time of every serial online in it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ConnectionRecord {
    #[serde(default)]
    listed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    first_seen: BTreeMap<String, DateTime<Utc>>,
}

impl ConnectionRecord {
    fn load(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read {:?}: {}", path, e);
                return None;
            }
        };
        toml::from_str(&content)
            .inspect_err(|e| warn!("Ignoring malformed {:?}: {}", path, e))
            .ok()
    }

    fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::store(format!("Failed to serialize connection times: {}", e)))?;
        let temp_path = sibling(path, ".tmp");
        std::fs::write(&temp_path, content)
            .map_err(|e| Error::store(format!("Failed to write temp file: {}", e)))?;
        std::fs::rename(&temp_path, path)
            .map_err(|e| Error::store(format!("Failed to rename temp file: {}", e)))?;
        Ok(())
    }

    /// Apply one listing; returns the connection time of each online serial
    ///
    /// The flag is false for a stale listing, which leaves the record as is.
    fn apply(
        &mut self,
        online: &[&str],
        listed_at: DateTime<Utc>,
    ) -> (HashMap<String, DateTime<Utc>>, bool) {
        if self.listed_at.is_some_and(|last| listed_at < last) {
            trace!("Ignoring stale listing from {}", listed_at);
            let times = online
                .iter()
                .map(|serial| {
                    let time = self.first_seen.get(*serial).copied().unwrap_or(listed_at);
                    (serial.to_string(), time)
                })
                .collect();
            return (times, false);
        }

        self.first_seen.retain(|serial, _| online.contains(&serial.as_str()));
        let times = online
            .iter()
            .map(|serial| {
                let time = *self.first_seen.entry(serial.to_string()).or_insert(listed_at);
                (serial.to_string(), time)
            })
            .collect();
        self.listed_at = Some(listed_at);
        (times, true)
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

#[derive(Debug, Default)]
pub struct ConnectionTimes {
    record: Mutex<ConnectionRecord>,
    path: Option<PathBuf>,
}

impl ConnectionTimes {
    /// Times kept for the life of this value only
    pub fn new() -> Self {
        Self::default()
    }

    /// Times shared through `path` by every process using it
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            record: Mutex::new(ConnectionRecord::default()),
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record one listing of online serial numbers taken at `listed_at`
    ///
    /// Returns the connection time of each serial in `online`.
    pub fn observe<'a, I>(
        &self,
        online: I,
        listed_at: DateTime<Utc>,
    ) -> HashMap<String, DateTime<Utc>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let online: Vec<&str> = online.into_iter().collect();
        let mut record = self
            .record
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(path) = &self.path else {
            return record.apply(&online, listed_at).0;
        };

        // Without the file lock the in-memory record still gives stable times
        // for this process
        let lock = lock_file(path)
            .inspect_err(|e| warn!("Connection times not shared: {}", e))
            .ok();
        if lock.is_some() {
            if let Some(stored) = ConnectionRecord::load(path) {
                *record = stored;
            }
        }

        let (times, changed) = record.apply(&online, listed_at);
        if changed && lock.is_some() {
            if let Err(e) = record.save(path) {
                warn!("Failed to persist connection times: {}", e);
            }
        }
        times
    }
}

/// Exclusive lock on `<path>.lock`, released when the file is dropped
fn lock_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::store(format!("Failed to create {}: {}", parent.display(), e)))?;
    }
    let lock_path = sibling(path, ".lock");
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| Error::store(format!("Failed to open {}: {}", lock_path.display(), e)))?;
    file.lock_exclusive()
        .map_err(|e| Error::store(format!("Failed to lock {}: {}", lock_path.display(), e)))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap()
    }

    #[test]
    fn test_first_observation_is_kept() {
        let times = ConnectionTimes::new();
        times.observe(["emulator-5554"], at(0));
        let observed = times.observe(["emulator-5554", "R58M123"], at(5));

        assert_eq!(observed["emulator-5554"], at(0));
        assert_eq!(observed["R58M123"], at(5));
    }

    #[test]
    fn test_reconnect_gets_fresh_time() {
        let times = ConnectionTimes::new();
        times.observe(["emulator-5554"], at(0));
        times.observe([], at(1));
        let observed = times.observe(["emulator-5554"], at(2));

        assert_eq!(observed["emulator-5554"], at(2));
    }

    #[test]
    fn test_stale_listing_does_not_forget_device() {
        let times = ConnectionTimes::new();
        times.observe(["emulator-5554"], at(2));

        // An older cycle that did not see the emulator finishes late
        let stale = times.observe([], at(1));
        assert!(stale.is_empty());

        let observed = times.observe(["emulator-5554"], at(3));
        assert_eq!(observed["emulator-5554"], at(2));
    }

    #[test]
    fn test_stale_listing_reports_known_times() {
        let times = ConnectionTimes::new();
        times.observe(["R58M123"], at(2));

        let stale = times.observe(["R58M123", "emulator-5554"], at(1));
        assert_eq!(stale["R58M123"], at(2));
        assert_eq!(stale["emulator-5554"], at(1));

        // The stale sighting was not recorded
        let observed = times.observe(["R58M123", "emulator-5554"], at(4));
        assert_eq!(observed["emulator-5554"], at(4));
    }

    #[test]
    fn test_persistent_times_survive_new_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".runtarget").join("connections.toml");

        let first_run = ConnectionTimes::persistent(&path);
        first_run.observe(["emulator-5554"], at(0));
        drop(first_run);

        let second_run = ConnectionTimes::persistent(&path);
        let observed = second_run.observe(["emulator-5554"], at(30));
        assert_eq!(observed["emulator-5554"], at(0));
        assert!(path.exists());
    }

    #[test]
    fn test_persistent_times_forget_disconnected_serial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("connections.toml");

        ConnectionTimes::persistent(&path).observe(["emulator-5554"], at(0));
        ConnectionTimes::persistent(&path).observe([], at(10));
        let observed = ConnectionTimes::persistent(&path).observe(["emulator-5554"], at(20));
        assert_eq!(observed["emulator-5554"], at(20));
    }

    #[test]
    fn test_malformed_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("connections.toml");
        std::fs::write(&path, "first_seen = [not a table").unwrap();

        let observed = ConnectionTimes::persistent(&path).observe(["R58M123"], at(5));
        assert_eq!(observed["R58M123"], at(5));
    }
}
