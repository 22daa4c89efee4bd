use std::path::PathBuf;

use thiserror::Error;

/// Everything that can end the monitor with a fault.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("{device} read failed: {detail}")]
    SensorRead { device: &'static str, detail: String },

    #[error("display write failed: {0}")]
    DisplayWrite(String),

    #[error("failed to open {device} on {path}: {detail}")]
    BusOpen {
        device: &'static str,
        path: String,
        detail: String,
    },

    #[error("{device} initialisation failed: {detail}")]
    DeviceInit { device: &'static str, detail: String },

    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("failed to read preferences from {path:?}: {source}")]
    PreferencesIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse preferences: {0}")]
    PreferencesParse(#[from] toml::de::Error),

    #[error("invalid preferences: {0}")]
    InvalidPreferences(String),
}
