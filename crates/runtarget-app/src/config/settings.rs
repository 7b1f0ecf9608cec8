//! Settings parser for .runtarget/config.toml

use super::types::Settings;
use runtarget_core::prelude::*;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";
pub const RUNTARGET_DIR: &str = ".runtarget";

/// Load settings from `.runtarget/config.toml`
///
/// A missing or unparsable file yields defaults.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(RUNTARGET_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create `.runtarget/` with a commented default config if absent
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let runtarget_dir = ensure_runtarget_dir(project_path)?;

    let config_path = runtarget_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# runtarget configuration

[discovery]
poll_interval_ms = 2000     # Refresh cadence for `runtarget watch`
timeout_secs = 20           # Bound for one discovery cycle
# adb_path = "/opt/android/platform-tools/adb"   # Default: $ANDROID_HOME, then PATH
# avd_home = "/home/me/.android/avd"             # Default: $ANDROID_AVD_HOME, then ~/.android/avd

[selection]
state_file = "selection.toml"   # Relative to .runtarget/
connection_times_file = "connections.toml"   # First-seen times of attached devices
"#;
        std::fs::write(&config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config at {:?}", config_path);
    }

    Ok(())
}

/// Save settings to `.runtarget/config.toml`
///
/// Uses atomic write (temp file + rename).
pub fn save_settings(project_path: &Path, settings: &Settings) -> Result<()> {
    let runtarget_dir = ensure_runtarget_dir(project_path)?;

    let config_path = runtarget_dir.join(CONFIG_FILENAME);
    let temp_path = runtarget_dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;
    let full_content = format!("# runtarget configuration\n\n{}", content);

    std::fs::write(&temp_path, &full_content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;

    std::fs::rename(&temp_path, &config_path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}

/// Where the selected-state record lives for this project
pub fn selection_state_path(project_path: &Path, settings: &Settings) -> PathBuf {
    project_path
        .join(RUNTARGET_DIR)
        .join(&settings.selection.state_file)
}

/// Where first-seen times of attached devices live for this project
pub fn connection_times_path(project_path: &Path, settings: &Settings) -> PathBuf {
    project_path
        .join(RUNTARGET_DIR)
        .join(&settings.selection.connection_times_file)
}

fn ensure_runtarget_dir(project_path: &Path) -> Result<PathBuf> {
    let runtarget_dir = project_path.join(RUNTARGET_DIR);
    if !runtarget_dir.exists() {
        std::fs::create_dir_all(&runtarget_dir)
            .map_err(|e| Error::config(format!("Failed to create .runtarget dir: {}", e)))?;
    }
    Ok(runtarget_dir)
}
