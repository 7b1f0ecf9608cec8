//! AVD snapshot enumeration
//!
//! Each snapshot lives in `<avd data folder>/snapshots/<id>/` next to a
//! `snapshot.pb` protocol buffer written by the emulator. Only two fields of
//! that message matter here:
//!
//! | field | name           | wire type          |
//! |-------|----------------|--------------------|
//! | 3     | `images`       | length-delimited, repeated |
//! | 9     | `logical_name` | length-delimited (string)  |
//!
//! Everything else is skipped according to its wire type.

use std::path::{Path, PathBuf};

use runtarget_core::prelude::*;
use runtarget_core::{Snapshot, DEFAULT_SNAPSHOT, DEFAULT_SNAPSHOT_COLLECTION, DEFAULT_SNAPSHOT_DIRECTORY};

const SNAPSHOTS_DIRECTORY: &str = "snapshots";
const SNAPSHOT_PROTO_FILE: &str = "snapshot.pb";

const IMAGES_FIELD: u64 = 3;
const LOGICAL_NAME_FIELD: u64 = 9;

/// The parts of the emulator's `Snapshot` message used for naming
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotProto {
    pub image_count: usize,
    pub logical_name: Option<String>,
}

/// Decode a `snapshot.pb` message
pub fn decode_snapshot_proto(bytes: &[u8]) -> std::result::Result<SnapshotProto, String> {
    let mut reader = WireReader { bytes, pos: 0 };
    let mut proto = SnapshotProto::default();

    while !reader.is_empty() {
        let tag = reader.varint()?;
        let field = tag >> 3;
        let wire_type = tag & 0x7;

        match (field, wire_type) {
            (IMAGES_FIELD, 2) => {
                reader.length_delimited()?;
                proto.image_count += 1;
            }
            (LOGICAL_NAME_FIELD, 2) => {
                let raw = reader.length_delimited()?;
                let name = std::str::from_utf8(raw)
                    .map_err(|e| format!("logical_name is not UTF-8: {}", e))?;
                proto.logical_name = Some(name.to_string());
            }
            (_, 0) => {
                reader.varint()?;
            }
            (_, 1) => {
                reader.skip(8)?;
            }
            (_, 2) => {
                reader.length_delimited()?;
            }
            (_, 5) => {
                reader.skip(4)?;
            }
            (_, other) => return Err(format!("unsupported wire type {}", other)),
        }
    }

    Ok(proto)
}

struct WireReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn varint(&mut self) -> std::result::Result<u64, String> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = *self
                .bytes
                .get(self.pos)
                .ok_or_else(|| "truncated varint".to_string())?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err("varint too long".to_string())
    }

    fn skip(&mut self, len: usize) -> std::result::Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| format!("field of {} bytes overruns message", len))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn length_delimited(&mut self) -> std::result::Result<&'a [u8], String> {
        let len = self.varint()?;
        let len = usize::try_from(len).map_err(|_| "length overflows usize".to_string())?;
        self.skip(len)
    }
}

/// Read one snapshot directory
///
/// Returns `Ok(None)` when the directory holds no `snapshot.pb`. The display
/// name is the protobuf's logical name, or the directory name when the name
/// is missing or the snapshot has no images.
pub fn read_snapshot(snapshot_dir: &Path) -> Result<Option<Snapshot>> {
    let proto_path = snapshot_dir.join(SNAPSHOT_PROTO_FILE);
    if !proto_path.is_file() {
        return Ok(None);
    }

    let Some(dir_name) = snapshot_dir.file_name().map(|n| n.to_string_lossy().into_owned())
    else {
        return Ok(None);
    };

    let bytes = std::fs::read(&proto_path)?;
    let proto =
        decode_snapshot_proto(&bytes).map_err(|reason| Error::snapshot_decode(&proto_path, reason))?;

    let display_name = match proto.logical_name {
        Some(name) if !name.is_empty() && proto.image_count > 0 => name,
        _ => dir_name.clone(),
    };

    Ok(Some(Snapshot::new(PathBuf::from(dir_name), display_name)))
}

/// Collect the snapshots of an AVD
///
/// `default_boot` is never read from disk; instead the quick boot snapshot
/// leads the collection unless the AVD forces cold boot. Undecodable
/// snapshots are skipped.
pub fn list_snapshots(data_folder: &Path, force_cold_boot: bool) -> Vec<Snapshot> {
    let mut named = Vec::new();
    let snapshots_dir = data_folder.join(SNAPSHOTS_DIRECTORY);

    match std::fs::read_dir(&snapshots_dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() || entry.file_name() == DEFAULT_SNAPSHOT_DIRECTORY {
                    continue;
                }
                match read_snapshot(&path) {
                    Ok(Some(snapshot)) => named.push(snapshot),
                    Ok(None) => {}
                    Err(e) => info!("Could not parse snapshot in {:?}: {}", path, e),
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!("Failed to list {:?}: {}", snapshots_dir, e),
    }

    named.sort_by(|a, b| {
        a.display_name()
            .cmp(b.display_name())
            .then_with(|| a.path().cmp(b.path()))
    });

    if force_cold_boot {
        return named;
    }
    if named.is_empty() {
        return DEFAULT_SNAPSHOT_COLLECTION.clone();
    }

    let mut snapshots = Vec::with_capacity(named.len() + 1);
    snapshots.push(DEFAULT_SNAPSHOT.clone());
    snapshots.extend(named);
    snapshots
}
