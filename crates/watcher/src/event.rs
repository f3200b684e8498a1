//! Change events delivered to listeners

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use scanwatch_core::Fingerprint;
use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Kind of change detected between two passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// File appeared, or became readable again
    Created,

    /// File recorded in the previous pass is gone
    Deleted,

    /// File content fingerprint changed
    Updated,
}

impl EventKind {
    /// Every concrete kind, in dispatch-table order
    pub const ALL: [EventKind; 3] = [EventKind::Created, EventKind::Deleted, EventKind::Updated];

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Deleted => "deleted",
            Self::Updated => "updated",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Created => 0,
            Self::Deleted => 1,
            Self::Updated => 2,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "deleted" => Ok(Self::Deleted),
            "updated" => Ok(Self::Updated),
            _ => Err(MonitorError::UnknownEventKind(s.to_string())),
        }
    }
}

/// What a listener subscribes to
///
/// `All` is registration-time sugar: it never appears on a dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    /// A single concrete kind
    Kind(EventKind),

    /// Every concrete kind known at registration time
    All,
}

impl From<EventKind> for Subscription {
    fn from(kind: EventKind) -> Self {
        Self::Kind(kind)
    }
}

impl FromStr for Subscription {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Kind)
    }
}

/// Payload handed to listeners
///
/// - `created`: `previous` is `None`
/// - `updated`: both fingerprints present and different
/// - `deleted`: both fingerprints `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEvent {
    /// The kind of change
    pub kind: EventKind,

    /// Absolute path of the file under the monitored root
    pub path: PathBuf,

    /// Fingerprint recorded in the previous pass
    pub previous: Option<Fingerprint>,

    /// Fingerprint computed in this pass
    pub current: Option<Fingerprint>,
}

impl FileEvent {
    /// A file that appeared with the given content
    pub fn created(path: impl Into<PathBuf>, current: Fingerprint) -> Self {
        Self {
            kind: EventKind::Created,
            path: path.into(),
            previous: None,
            current: Some(current),
        }
    }

    /// A file whose content changed
    pub fn updated(path: impl Into<PathBuf>, previous: Fingerprint, current: Fingerprint) -> Self {
        Self {
            kind: EventKind::Updated,
            path: path.into(),
            previous: Some(previous),
            current: Some(current),
        }
    }

    /// A file that disappeared
    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: EventKind::Deleted,
            path: path.into(),
            previous: None,
            current: None,
        }
    }

    /// Path relative to `root`, or the full path if it lies outside it
    pub fn relative_path(&self, root: &Path) -> &Path {
        self.path.strip_prefix(root).unwrap_or(&self.path)
    }
}
