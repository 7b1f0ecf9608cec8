//! Emulator boot snapshots

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Directory name the emulator uses for its quick boot snapshot
pub const DEFAULT_SNAPSHOT_DIRECTORY: &str = "default_boot";

/// The quick boot snapshot every AVD gets unless cold boot is forced
pub static DEFAULT_SNAPSHOT: LazyLock<Snapshot> =
    LazyLock::new(|| Snapshot::new(DEFAULT_SNAPSHOT_DIRECTORY, "Quickboot"));

/// Snapshot collection of an AVD that only has its quick boot snapshot
pub static DEFAULT_SNAPSHOT_COLLECTION: LazyLock<Vec<Snapshot>> =
    LazyLock::new(|| vec![DEFAULT_SNAPSHOT.clone()]);

/// A saved emulator state usable to resume boot
///
/// `path` is the snapshot directory relative to the AVD's `snapshots/`
/// folder. Identity is the path: two snapshots with the same display name
/// in different directories are different snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snapshot {
    path: PathBuf,
    display_name: String,
}

impl Snapshot {
    pub fn new(path: impl Into<PathBuf>, display_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            display_name: display_name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_default(&self) -> bool {
        self.path == Path::new(DEFAULT_SNAPSHOT_DIRECTORY)
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name)
    }
}
