//! Selection reconciliation
//!
//! Decides which target a run uses from the current device list and the
//! stored record of what the user chose:
//!
//! - [`reading`] resolves stored targets against devices (pure)
//! - [`writing`] decides what a new combo-box choice changes
//! - [`update`] names each change a store applies to the record
//! - [`service`] ties both to a [`store::SelectionStore`] and a [`clock::Clock`]

pub mod clock;
pub mod reading;
pub mod service;
pub mod state;
pub mod store;
pub mod update;
pub mod writing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use reading::{default_target, resolve_target, TargetsForReading};
pub use service::DevicesSelectedService;
pub use state::SelectedState;
pub use store::{MemorySelectionStore, SelectionStore, TomlSelectionStore};
pub use update::SelectionUpdate;
pub use writing::{TargetsForWriting, Transition};
