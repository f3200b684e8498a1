//! Monitor loop
//!
//! Owns the previous snapshot and the listener registry, runs one baseline
//! pass and then rescans the tree until stopped. Each pass walks the tree
//! (created/updated events), reports keys that vanished from the snapshot
//! (deleted events) and then replaces the previous snapshot wholesale.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use scanwatch_core::Snapshot;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::event::{FileEvent, Subscription};
use crate::ignore::IgnoreRules;
use crate::registry::{ListenerFailure, ListenerRegistry};
use crate::signal::StopSignal;
use crate::walk::{TreeWalker, WalkStats};

/// Lifecycle state of a [`Monitor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Created, no pass run yet
    Idle,
    /// Building the baseline snapshot
    Initializing,
    /// Baseline recorded; passes report changes
    Scanning,
}

/// Outcome of one pass
#[derive(Debug, Clone, Default)]
pub struct PassSummary {
    /// Pass number, starting at 0 for the baseline
    pub pass: u64,
    /// Files in the snapshot after the pass
    pub files: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Files recorded without a fingerprint
    pub unreadable: usize,
    /// Entries that could not be traversed
    pub skipped: usize,
    /// Listener failures captured under the isolate policy
    pub failures: Vec<ListenerFailure>,
    /// The pass was stopped before completing; nothing was rotated
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl PassSummary {
    /// Total number of events dispatched
    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    fn from_walk(pass: u64, stats: WalkStats) -> Self {
        Self {
            pass,
            files: stats.files,
            created: stats.created,
            updated: stats.updated,
            unreadable: stats.unreadable,
            skipped: stats.skipped,
            failures: stats.failures,
            interrupted: stats.interrupted,
            ..Self::default()
        }
    }
}

/// Polling directory monitor
///
/// Single threaded and synchronous: listeners run inline on the thread that
/// drives the monitor, and one pass never overlaps another.
pub struct Monitor {
    /// Canonical monitored root
    root: PathBuf,

    config: MonitorConfig,

    ignore: IgnoreRules,

    registry: ListenerRegistry,

    /// State as of the last completed pass
    previous: Snapshot,

    state: MonitorState,

    stop: StopSignal,

    /// Completed passes, baseline included
    passes: u64,
}

impl Monitor {
    /// Create a monitor with the default configuration
    pub fn new(directory: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(directory, MonitorConfig::default())
    }

    /// Create a monitor for `directory`
    ///
    /// Fails with [`MonitorError::InvalidDirectory`] if the path does not
    /// exist or is not a directory.
    pub fn with_config(directory: impl AsRef<Path>, config: MonitorConfig) -> Result<Self> {
        let directory = directory.as_ref();
        config.validate()?;

        let root = directory
            .canonicalize()
            .map_err(|e| MonitorError::InvalidDirectory {
                path: directory.to_path_buf(),
                reason: e.to_string(),
            })?;
        if !root.is_dir() {
            return Err(MonitorError::InvalidDirectory {
                path: directory.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let ignore = IgnoreRules::load(&root, &config.ignore)?;

        Ok(Self {
            root,
            config,
            ignore,
            registry: ListenerRegistry::new(),
            previous: Snapshot::new(),
            state: MonitorState::Idle,
            stop: StopSignal::new(),
            passes: 0,
        })
    }

    /// Subscribe a listener to one kind or to all kinds
    pub fn register<F>(&mut self, subscription: Subscription, listener: F)
    where
        F: Fn(&FileEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry.register(subscription, Arc::new(listener));
    }

    /// Subscribe by kind name: `created`, `deleted`, `updated` or `all`
    pub fn register_named<F>(&mut self, kind: &str, listener: F) -> Result<()>
    where
        F: Fn(&FileEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry.register_named(kind, Arc::new(listener))
    }

    /// Handle that stops [`Monitor::start`] from any thread
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Canonical monitored root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Snapshot from the last completed pass
    pub fn snapshot(&self) -> &Snapshot {
        &self.previous
    }

    /// Completed passes, baseline included
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Build the baseline snapshot without dispatching any event
    pub fn initialize(&mut self) -> Result<PassSummary> {
        self.state = MonitorState::Initializing;
        info!("Recording baseline for {}", self.root.display());

        let summary = self.run_pass(true)?;
        if !summary.interrupted {
            self.state = MonitorState::Scanning;
        }
        Ok(summary)
    }

    /// Run one pass: walk, detect deletions, rotate the snapshot
    ///
    /// Called before [`Monitor::initialize`], every file is reported as created
    pub fn scan_once(&mut self) -> Result<PassSummary> {
        self.state = MonitorState::Scanning;
        self.run_pass(false)
    }

    /// Run the monitor loop until the stop signal fires
    ///
    /// Records the baseline, then repeats [`Monitor::scan_once`] separated by
    /// the configured poll interval. Returns `Ok(())` once stopped; an error
    /// means a pass was aborted by a listener failure or an I/O error.
    pub fn start(&mut self) -> Result<()> {
        let interval = self.config.poll_interval();
        info!(
            "Starting monitor for {} (interval: {:?}, listener failures: {:?})",
            self.root.display(),
            interval,
            self.config.listener_failures
        );
        if self.registry.is_empty() {
            warn!("No listeners registered for {}; changes will go unreported", self.root.display());
        }

        if self.state == MonitorState::Idle && !self.stop.is_stopped() {
            self.initialize()?;
        }

        while !self.stop.is_stopped() {
            self.scan_once()?;

            if self.stop.wait_timeout(interval) {
                break;
            }
        }

        info!("Monitor for {} stopped after {} pass(es)", self.root.display(), self.passes);
        Ok(())
    }

    fn run_pass(&mut self, suppress_events: bool) -> Result<PassSummary> {
        let started = Instant::now();
        let policy = self.config.listener_failures;
        let mut current = Snapshot::with_capacity(self.previous.len());

        let walker = TreeWalker::new(&self.root, &self.ignore, &self.registry, policy, &self.stop);
        let stats = walker.walk(&self.previous, &mut current, suppress_events)?;
        let mut summary = PassSummary::from_walk(self.passes, stats);

        if summary.interrupted {
            debug!("Pass {} interrupted, discarding partial snapshot", self.passes);
            summary.elapsed = started.elapsed();
            return Ok(summary);
        }

        if !suppress_events {
            for path in self.previous.removed_from(&current) {
                let event = FileEvent::deleted(path);
                summary.failures.extend(self.registry.dispatch(&event, policy)?);
                summary.deleted += 1;
            }
        }

        self.previous = current;
        self.passes += 1;
        summary.files = self.previous.len();
        summary.elapsed = started.elapsed();

        if summary.changes() > 0 || !summary.failures.is_empty() {
            info!(
                "Pass {}: {} created, {} updated, {} deleted ({} files, {} listener failures, {:?})",
                summary.pass,
                summary.created,
                summary.updated,
                summary.deleted,
                summary.files,
                summary.failures.len(),
                summary.elapsed
            );
        } else {
            debug!("Pass {}: no changes ({} files, {:?})", summary.pass, summary.files, summary.elapsed);
        }

        Ok(summary)
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("root", &self.root)
            .field("state", &self.state)
            .field("passes", &self.passes)
            .field("files", &self.previous.len())
            .field("listeners", &self.registry)
            .finish()
    }
}
