//! Configuration file parsing for runtarget
//!
//! Supports `.runtarget/config.toml` (discovery and selection settings).

pub mod settings;
pub mod types;

pub use settings::{
    connection_times_path, init_config_dir, load_settings, save_settings, selection_state_path,
    RUNTARGET_DIR,
};
pub use types::*;
