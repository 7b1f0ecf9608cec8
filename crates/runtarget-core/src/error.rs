//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Discovery Errors
    // ─────────────────────────────────────────────────────────────
    #[error("adb not found. Set ANDROID_HOME or add platform-tools to your PATH.")]
    AdbNotFound,

    #[error("adb error: {message}")]
    Adb { message: String },

    #[error("AVD error: {message}")]
    Avd { message: String },

    #[error("Failed to decode snapshot protobuf {path}: {reason}")]
    SnapshotDecode { path: PathBuf, reason: String },

    #[error("Device discovery timed out after {secs}s")]
    DiscoveryTimeout { secs: u64 },

    // ─────────────────────────────────────────────────────────────
    // Persistence Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Selection store error: {message}")]
    Store { message: String },

    #[error("Selection state is locked by another process: {path}")]
    StateLocked { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Key Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid device key: {value:?}")]
    InvalidKey { value: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn adb(message: impl Into<String>) -> Self {
        Self::Adb {
            message: message.into(),
        }
    }

    pub fn avd(message: impl Into<String>) -> Self {
        Self::Avd {
            message: message.into(),
        }
    }

    pub fn snapshot_decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SnapshotDecode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_key(value: impl Into<String>) -> Self {
        Self::InvalidKey {
            value: value.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors degrade the current discovery cycle or selection
    /// read; the next cycle may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Adb { .. }
                | Error::Avd { .. }
                | Error::SnapshotDecode { .. }
                | Error::DiscoveryTimeout { .. }
                | Error::StateLocked { .. }
                | Error::InvalidKey { .. }
        )
    }

    /// Check if this error should stop the command outright
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config { .. } | Error::Store { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
