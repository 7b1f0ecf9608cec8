//! # runtarget-core - Device and Target Domain Types
//!
//! Foundation crate for runtarget. Provides the identity, device and target
//! model that discovery produces and selection reconciles, plus error
//! handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Identity (`key`)
//! - [`Key`] - Serial number, AVD path, AVD name or legacy token
//!
//! ### Devices (`device`, `snapshot`)
//! - [`Device`] - A [`PhysicalDevice`] or [`VirtualDevice`]
//! - [`Snapshot`], [`DEFAULT_SNAPSHOT`] - Emulator boot snapshots
//! - [`DeviceType`], [`LaunchCompatibility`], [`DeviceHandle`]
//!
//! ### Targets (`target`)
//! - [`Target`] - Quick boot, cold boot, boot with snapshot, running device
//!
//! ### Ordering (`ordering`)
//! - [`compare_devices()`] - Presentation and default-pick order
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use runtarget_core::prelude::*;
//! ```

pub mod device;
pub mod error;
pub mod key;
pub mod logging;
pub mod ordering;
pub mod prelude;
pub mod snapshot;
pub mod target;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Re-export commonly used types at crate root for convenience
pub use device::{
    Device, DeviceHandle, DeviceType, LaunchCompatibility, LaunchCompatibilityState,
    PhysicalDevice, VirtualDevice,
};
pub use error::{Error, Result, ResultExt};
pub use key::Key;
pub use ordering::{compare_devices, first_valid_device, sort_devices};
pub use snapshot::{
    Snapshot, DEFAULT_SNAPSHOT, DEFAULT_SNAPSHOT_COLLECTION, DEFAULT_SNAPSHOT_DIRECTORY,
};
pub use target::Target;
