//! Tree walker
//!
//! Enumerates every regular file under the monitored root, fingerprints it,
//! classifies it against the previous snapshot and dispatches `created` /
//! `updated` events as each file is visited. Entries of each directory are
//! visited in file-name order.

use std::io::ErrorKind;
use std::path::Path;

use scanwatch_core::{hash_file, Change, Fingerprint, Snapshot};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::event::FileEvent;
use crate::ignore::IgnoreRules;
use crate::registry::{FailurePolicy, ListenerFailure, ListenerRegistry};
use crate::signal::StopSignal;

/// Counters for one walk
#[derive(Debug, Default)]
pub struct WalkStats {
    /// Regular files recorded in the in-progress snapshot
    pub files: usize,

    /// `created` events dispatched
    pub created: usize,

    /// `updated` events dispatched
    pub updated: usize,

    /// Files recorded without a fingerprint
    pub unreadable: usize,

    /// Entries that could not be traversed (subtree skipped)
    pub skipped: usize,

    /// Listener failures captured under the isolate policy
    pub failures: Vec<ListenerFailure>,

    /// Walk stopped early on request; the snapshot is incomplete
    pub interrupted: bool,
}

/// Function used to fingerprint each regular file
pub type Fingerprinter<'a> = &'a (dyn Fn(&Path) -> anyhow::Result<Fingerprint> + Sync);

/// Walks one root, borrowing everything it needs from the monitor
pub struct TreeWalker<'a> {
    root: &'a Path,
    ignore: &'a IgnoreRules,
    registry: &'a ListenerRegistry,
    policy: FailurePolicy,
    stop: &'a StopSignal,
    fingerprint: Fingerprinter<'a>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        root: &'a Path,
        ignore: &'a IgnoreRules,
        registry: &'a ListenerRegistry,
        policy: FailurePolicy,
        stop: &'a StopSignal,
    ) -> Self {
        Self {
            root,
            ignore,
            registry,
            policy,
            stop,
            fingerprint: &hash_file,
        }
    }

    /// Replace [`hash_file`] as the fingerprint function
    pub fn with_fingerprinter(mut self, fingerprint: Fingerprinter<'a>) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Walk the tree, filling `current` and classifying against `previous`
    ///
    /// With `suppress_events` the snapshot is built without dispatching
    /// anything (baseline pass). Every visited regular file is written into
    /// `current`, with `None` when it could not be fingerprinted.
    pub fn walk(&self, previous: &Snapshot, current: &mut Snapshot, suppress_events: bool) -> Result<WalkStats> {
        let mut stats = WalkStats::default();

        let walker = WalkDir::new(self.root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.ignore.should_ignore(e.path(), e.file_type().is_dir()));

        for entry in walker {
            if self.stop.is_stopped() {
                stats.interrupted = true;
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    stats.skipped += 1;
                    self.skip_subtree(&err, previous, current);
                    continue;
                }
            };

            // Directories only contribute their contents; symlinks and
            // special files are not tracked at all
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() {
                trace!("Skipping non-regular file: {}", entry.path().display());
                continue;
            }

            let path = entry.into_path();
            let fingerprint = match (self.fingerprint)(&path) {
                Ok(fingerprint) => Some(fingerprint),
                Err(e) => {
                    debug!("Fingerprint failed, recording as unreadable: {:#}", e);
                    stats.unreadable += 1;
                    None
                }
            };

            if let (false, Some(current_fp)) = (suppress_events, fingerprint) {
                if let Some(change) = previous.classify(&path, Some(current_fp)) {
                    let event = match change {
                        Change::Created => {
                            stats.created += 1;
                            FileEvent::created(path.clone(), current_fp)
                        }
                        Change::Updated { previous: old } => {
                            stats.updated += 1;
                            FileEvent::updated(path.clone(), old, current_fp)
                        }
                    };
                    stats.failures.extend(self.registry.dispatch(&event, self.policy)?);
                }
            }

            current.insert(path, fingerprint);
            stats.files += 1;
        }

        Ok(stats)
    }

    /// Keep the previous entries of a subtree that could not be read
    ///
    /// A directory that vanished mid-walk is not carried over, so its files
    /// are reported as deleted.
    fn skip_subtree(&self, err: &walkdir::Error, previous: &Snapshot, current: &mut Snapshot) {
        let Some(path) = err.path() else {
            warn!("Traversal error under {}: {}", self.root.display(), err);
            return;
        };

        let vanished = err.io_error().map(|e| e.kind()) == Some(ErrorKind::NotFound);
        if vanished {
            debug!("Entry vanished during walk: {}", path.display());
            return;
        }

        let kept = current.carry_over(previous, path);
        warn!(
            "Skipping unreadable entry {} ({} known file(s) kept): {}",
            path.display(),
            kept,
            err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Subscription};
    use crate::registry::Listener;
    use parking_lot::Mutex;
    use scanwatch_core::hash_bytes;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Harness {
        registry: ListenerRegistry,
        events: Arc<Mutex<Vec<FileEvent>>>,
        stop: StopSignal,
    }

    impl Harness {
        fn new() -> Self {
            let events: Arc<Mutex<Vec<FileEvent>>> = Arc::default();
            let sink = Arc::clone(&events);
            let listener: Listener = Arc::new(move |event: &FileEvent| -> anyhow::Result<()> {
                sink.lock().push(event.clone());
                Ok(())
            });

            let mut registry = ListenerRegistry::new();
            registry.register(Subscription::All, listener);

            Self {
                registry,
                events,
                stop: StopSignal::new(),
            }
        }

        fn walk(&self, root: &Path, previous: &Snapshot, suppress: bool) -> (Snapshot, WalkStats) {
            self.walk_with(root, previous, suppress, &hash_file)
        }

        fn walk_with(
            &self,
            root: &Path,
            previous: &Snapshot,
            suppress: bool,
            fingerprint: Fingerprinter<'_>,
        ) -> (Snapshot, WalkStats) {
            let ignore = IgnoreRules::none();
            let walker = TreeWalker::new(root, &ignore, &self.registry, FailurePolicy::Abort, &self.stop)
                .with_fingerprinter(fingerprint);
            let mut current = Snapshot::new();
            let stats = walker.walk(previous, &mut current, suppress).unwrap();
            (current, stats)
        }

        fn take_events(&self) -> Vec<FileEvent> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    #[test]
    fn test_baseline_walk_records_without_events() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b/c"))?;
        fs::write(root.join("top.txt"), b"top")?;
        fs::write(root.join("a/b/c/deep.txt"), b"deep")?;

        let harness = Harness::new();
        let (snapshot, stats) = harness.walk(root, &Snapshot::new(), true);

        assert_eq!(stats.files, 2);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(&root.join("a/b/c/deep.txt")), Some(Some(hash_bytes(b"deep"))));
        // Directories are never snapshot entries
        assert!(!snapshot.contains(&root.join("a")));
        assert!(harness.events.lock().is_empty());
        Ok(())
    }

    #[test]
    fn test_walk_classifies_against_previous() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::write(root.join("same.txt"), b"same")?;
        fs::write(root.join("changed.txt"), b"new")?;
        fs::write(root.join("fresh.txt"), b"fresh")?;

        let previous: Snapshot = [
            (root.join("same.txt"), Some(hash_bytes(b"same"))),
            (root.join("changed.txt"), Some(hash_bytes(b"old"))),
        ]
        .into_iter()
        .collect();

        let harness = Harness::new();
        let (snapshot, stats) = harness.walk(root, &previous, false);

        assert_eq!((stats.created, stats.updated), (1, 1));
        assert_eq!(snapshot.len(), 3);

        let mut events = harness.events.lock().clone();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            events,
            vec![
                FileEvent::updated(root.join("changed.txt"), hash_bytes(b"old"), hash_bytes(b"new")),
                FileEvent::created(root.join("fresh.txt"), hash_bytes(b"fresh")),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_walk_never_reports_deletes() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        let previous: Snapshot = [(root.join("gone.txt"), Some(hash_bytes(b"gone")))]
            .into_iter()
            .collect();

        let harness = Harness::new();
        let (snapshot, _) = harness.walk(root, &previous, false);

        assert!(snapshot.is_empty());
        assert!(harness.events.lock().iter().all(|e| e.kind != EventKind::Deleted));
        Ok(())
    }

    #[test]
    fn test_stop_interrupts_walk() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("a.txt"), b"a")?;

        let harness = Harness::new();
        harness.stop.stop();
        let (snapshot, stats) = harness.walk(temp_dir.path(), &Snapshot::new(), false);

        assert!(stats.interrupted);
        assert!(snapshot.is_empty());
        Ok(())
    }

    #[test]
    fn test_ignored_entries_are_pruned() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("build"))?;
        fs::write(root.join("build/out.bin"), b"out")?;
        fs::write(root.join("main.rs"), b"fn main() {}")?;
        fs::write(root.join("main.rs.swp"), b"swap")?;

        let config = crate::ignore::IgnoreConfig {
            use_gitignore: false,
            patterns: vec!["build/".to_string(), "*.swp".to_string()],
        };
        let ignore = IgnoreRules::load(root, &config)?;
        let harness = Harness::new();
        let walker = TreeWalker::new(root, &ignore, &harness.registry, FailurePolicy::Isolate, &harness.stop);

        let mut current = Snapshot::new();
        walker.walk(&Snapshot::new(), &mut current, false)?;

        assert_eq!(current.paths().collect::<Vec<_>>(), vec![root.join("main.rs").as_path()]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::write(root.join("real.txt"), b"real")?;
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("link.txt"))?;
        std::os::unix::fs::symlink(root, root.join("loop"))?;

        let harness = Harness::new();
        let (snapshot, stats) = harness.walk(root, &Snapshot::new(), false);

        assert_eq!(stats.files, 1);
        assert!(snapshot.contains(&root.join("real.txt")));
        assert!(!snapshot.contains(&root.join("link.txt")));
        assert_eq!(harness.events.lock().len(), 1);
        Ok(())
    }

    #[test]
    fn test_unfingerprintable_file_is_created_once_readable() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        let guarded = root.join("guarded.txt");
        fs::write(&guarded, b"guarded")?;

        let failing = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&failing);
        let fingerprint = move |path: &Path| -> anyhow::Result<Fingerprint> {
            if flag.load(Ordering::SeqCst) && path.ends_with("guarded.txt") {
                anyhow::bail!("permission denied: {}", path.display());
            }
            hash_file(path)
        };
        let harness = Harness::new();

        // Unreadable: recorded as None, nothing fires
        let (first, stats) = harness.walk_with(root, &Snapshot::new(), false, &fingerprint);
        assert_eq!(stats.unreadable, 1);
        assert_eq!(stats.files, 1);
        assert_eq!(first.get(&guarded), Some(None));
        assert!(harness.take_events().is_empty());

        // Still unreadable: still nothing
        let (second, _) = harness.walk_with(root, &first, false, &fingerprint);
        assert_eq!(second.get(&guarded), Some(None));
        assert!(harness.take_events().is_empty());

        // Readable again: reported as created against the stored None
        failing.store(false, Ordering::SeqCst);
        let (third, stats) = harness.walk_with(root, &second, false, &fingerprint);
        assert_eq!(stats.created, 1);
        assert_eq!(third.get(&guarded), Some(Some(hash_bytes(b"guarded"))));
        assert_eq!(harness.take_events(), vec![FileEvent::created(&guarded, hash_bytes(b"guarded"))]);
        Ok(())
    }

    #[test]
    fn test_untraversable_directory_keeps_previous_entries() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().to_path_buf();
        fs::write(root.join("a.txt"), b"a")?;
        fs::create_dir(root.join("z"))?;
        fs::write(root.join("z/inner.txt"), b"inner")?;

        let harness = Harness::new();
        let (previous, _) = harness.walk(&root, &Snapshot::new(), true);

        // Once `z` is listed as a directory, swap it for a file so opening
        // it fails with something other than NotFound
        let swap_root = root.clone();
        let fingerprint = move |path: &Path| -> anyhow::Result<Fingerprint> {
            if path.ends_with("a.txt") && swap_root.join("z").is_dir() {
                fs::remove_dir_all(swap_root.join("z"))?;
                fs::write(swap_root.join("z"), b"now a file")?;
            }
            hash_file(path)
        };
        let (current, stats) = harness.walk_with(&root, &previous, false, &fingerprint);

        assert_eq!(stats.skipped, 1);
        assert_eq!(current.get(&root.join("z/inner.txt")), Some(Some(hash_bytes(b"inner"))));
        assert!(!current.contains(&root.join("z")));
        assert!(previous.removed_from(&current).next().is_none());
        assert!(harness.take_events().is_empty());
        Ok(())
    }

    #[test]
    fn test_vanished_directory_is_not_kept() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().to_path_buf();
        fs::write(root.join("a.txt"), b"a")?;
        fs::create_dir(root.join("z"))?;
        fs::write(root.join("z/inner.txt"), b"inner")?;

        let harness = Harness::new();
        let (previous, _) = harness.walk(&root, &Snapshot::new(), true);

        let doomed = root.join("z");
        let fingerprint = move |path: &Path| -> anyhow::Result<Fingerprint> {
            if path.ends_with("a.txt") && doomed.exists() {
                fs::remove_dir_all(&doomed)?;
            }
            hash_file(path)
        };
        let (current, _) = harness.walk_with(&root, &previous, false, &fingerprint);

        assert!(!current.contains(&root.join("z/inner.txt")));
        assert_eq!(
            previous.removed_from(&current).collect::<Vec<_>>(),
            vec![root.join("z/inner.txt").as_path()]
        );
        Ok(())
    }
}
