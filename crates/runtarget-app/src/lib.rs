//! # runtarget-app - Selection State and Configuration
//!
//! Reconciles the devices found by [`runtarget_discovery`] with what the user
//! last selected, and persists that selection per project.
//!
//! ## Public API
//!
//! ### Selection (`selection`)
//! - [`DevicesSelectedService`] - Read and write combo-box and dialog selections
//! - [`TargetsForReading`] - Stored selections resolved against a device list
//! - [`TargetsForWriting`] - What a new combo-box choice changes
//! - [`SelectedState`] - The persisted record
//! - [`SelectionUpdate`] - One change applied to the record under the store lock
//! - [`SelectionStore`], [`TomlSelectionStore`], [`MemorySelectionStore`]
//!
//! ### Configuration (`config`)
//! - [`Settings`] - `.runtarget/config.toml`
//! - [`load_settings()`], [`save_settings()`], [`init_config_dir()`]

pub mod config;
pub mod selection;

pub use config::{
    connection_times_path, init_config_dir, load_settings, save_settings, selection_state_path,
    DiscoverySettings, SelectionSettings, Settings,
};
pub use selection::{
    default_target, resolve_target, Clock, DevicesSelectedService, FixedClock,
    MemorySelectionStore, SelectedState, SelectionStore, SelectionUpdate, SystemClock,
    TargetsForReading, TargetsForWriting, TomlSelectionStore, Transition,
};
