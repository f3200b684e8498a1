//! Error types for the directory monitor

use std::path::PathBuf;

use thiserror::Error;

use crate::event::EventKind;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur while configuring or running a monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Root path is missing or not a directory
    #[error("invalid directory {}: {reason}", path.display())]
    InvalidDirectory { path: PathBuf, reason: String },

    /// Registration under a name that is neither a concrete kind nor `all`
    #[error("unknown event kind: {0:?}")]
    UnknownEventKind(String),

    /// A listener failed while the failure policy was `abort`
    #[error("listener failed on {kind} event for {}: {source}", path.display())]
    Listener {
        kind: EventKind,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration value out of range or inconsistent
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Invalid ignore pattern
    #[error("invalid ignore pattern: {0}")]
    Ignore(#[from] ignore::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
