//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use runtarget_core::{Device, Key, Target};

/// runtarget - Resolve which Android device a run should target
#[derive(Parser, Debug)]
#[command(name = "runtarget")]
#[command(about = "Resolve which Android device a run should target", long_about = None)]
pub struct Args {
    /// Project directory holding .runtarget/ (default: current directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub project: Option<PathBuf>,

    /// Print NDJSON events instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List devices, most relevant first
    Devices,

    /// Show the target a run would use
    Selected,

    /// Choose the target for single-device runs
    Select {
        /// Device key: SerialNumber:<serial>, VirtualDevicePath:<dir>,
        /// VirtualDeviceName:<avd>, or a bare serial or AVD name
        #[arg(value_name = "KEY")]
        key: Key,

        #[command(flatten)]
        mode: BootMode,
    },

    /// Choose the targets for multiple-device runs
    SelectMultiple {
        #[arg(value_name = "KEY", required = true)]
        keys: Vec<Key>,
    },

    /// Show the targets a multiple-device run would use
    SelectedMultiple,

    /// Print the selected target whenever it changes (Ctrl-C to stop)
    Watch,

    /// Forget all stored selections
    Clear,

    /// Write a default .runtarget/config.toml
    Init,
}

/// How to boot the selected device
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
#[group(multiple = false)]
pub struct BootMode {
    /// Boot without loading a snapshot
    #[arg(long)]
    pub cold: bool,

    /// Boot from the named snapshot directory
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Use the device as it is currently running
    #[arg(long)]
    pub running: bool,
}

impl BootMode {
    /// Target for `key`; quick boot unless another mode was asked for
    pub fn target(&self, key: Key) -> Target {
        if self.cold {
            Target::cold_boot(key)
        } else if let Some(snapshot) = &self.snapshot {
            Target::boot_with_snapshot(key, snapshot.clone())
        } else if self.running {
            Target::running_device(key)
        } else {
            Target::quick_boot(key)
        }
    }
}

/// The device's own key when `key` names a listed device
///
/// A bare token also matches a running emulator by its serial number.
pub fn canonical_key(key: &Key, devices: &[Device]) -> Key {
    let as_serial = match key {
        Key::NonprefixedKey(token) => Some(Key::serial_number(token.clone())),
        _ => None,
    };
    devices
        .iter()
        .find(|d| d.matches(key) || as_serial.as_ref().is_some_and(|s| d.matches(s)))
        .map_or_else(|| key.clone(), |d| d.key().clone())
}
