//! Polling directory monitor for scanwatch
//!
//! This crate provides change notification without OS file-watch APIs:
//! - Repeated full scans of a directory tree with content fingerprints
//! - Snapshot diffing into created / updated / deleted events
//! - Ordered listener registration with an `all` wildcard
//! - Listener failure isolation and cooperative cancellation
//!
//! ```no_run
//! use scanwatch_watcher::{Monitor, Subscription};
//!
//! let mut monitor = Monitor::new("/srv/data")?;
//! monitor.register(Subscription::All, |event| {
//!     println!("{} {}", event.kind, event.path.display());
//!     Ok(())
//! });
//! monitor.start()?;
//! # Ok::<(), scanwatch_watcher::MonitorError>(())
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod ignore;
pub mod monitor;
pub mod registry;
pub mod signal;
pub mod walk;

pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use event::{EventKind, FileEvent, Subscription};
pub use crate::ignore::{IgnoreConfig, IgnoreRules};
pub use monitor::{Monitor, MonitorState, PassSummary};
pub use registry::{FailurePolicy, Listener, ListenerFailure, ListenerRegistry};
pub use signal::StopSignal;
pub use walk::{Fingerprinter, TreeWalker, WalkStats};

pub use scanwatch_core::{Fingerprint, Snapshot};
