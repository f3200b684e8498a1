//! Snapshot of a scanned directory tree
//!
//! A snapshot maps every regular file seen during one pass to its content
//! fingerprint. Files that could not be read during the pass are recorded
//! with `None` so they are neither reported as deleted nor forgotten.

use crate::hash::Fingerprint;
use ahash::AHashMap;
use std::path::{Path, PathBuf};

/// Change detected for a single file relative to a previous snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Path was unknown, or previously unreadable and readable now
    Created,
    /// Content fingerprint differs from the stored one
    Updated {
        /// Fingerprint recorded in the previous snapshot
        previous: Fingerprint,
    },
}

/// Mapping from file path to last known fingerprint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: AHashMap<PathBuf, Option<Fingerprint>>,
}

impl Snapshot {
    /// Create a new empty snapshot
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
        }
    }

    /// Create an empty snapshot sized for `capacity` files
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: AHashMap::with_capacity(capacity),
        }
    }

    /// Record a file; `None` marks it unreadable for this pass
    pub fn insert(&mut self, path: impl Into<PathBuf>, fingerprint: Option<Fingerprint>) {
        self.entries.insert(path.into(), fingerprint);
    }

    /// Look up a path
    ///
    /// The outer `Option` is presence, the inner one readability
    pub fn get(&self, path: &Path) -> Option<Option<Fingerprint>> {
        self.entries.get(path).copied()
    }

    /// Whether the path is a key of this snapshot
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of recorded files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&Path, Option<Fingerprint>)> {
        self.entries.iter().map(|(path, fp)| (path.as_path(), *fp))
    }

    /// Iterate over all recorded paths in unspecified order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    /// Classify a freshly fingerprinted file against this (previous) snapshot
    ///
    /// Returns `None` when no event should fire: the content is unchanged, or
    /// the file could not be fingerprinted this pass.
    pub fn classify(&self, path: &Path, current: Option<Fingerprint>) -> Option<Change> {
        let current = current?;

        match self.entries.get(path) {
            None | Some(None) => Some(Change::Created),
            Some(Some(previous)) if *previous != current => Some(Change::Updated {
                previous: *previous,
            }),
            Some(Some(_)) => None,
        }
    }

    /// Paths recorded in `self` that are absent from `current`
    ///
    /// Each removed key is yielded exactly once, in unspecified order
    pub fn removed_from<'a>(&'a self, current: &'a Snapshot) -> impl Iterator<Item = &'a Path> + 'a {
        self.paths().filter(move |path| !current.contains(path))
    }

    /// Copy every entry of `previous` strictly below `prefix` into `self`
    ///
    /// An entry for `prefix` itself is not copied: it was a file that has
    /// since become the unreadable directory. Entries already present in
    /// `self` are left untouched. Returns the number of entries copied.
    pub fn carry_over(&mut self, previous: &Snapshot, prefix: &Path) -> usize {
        let mut copied = 0;
        let below = |path: &Path| path != prefix && path.starts_with(prefix);
        for (path, fingerprint) in previous.iter().filter(|&(path, _)| below(path)) {
            if !self.entries.contains_key(path) {
                self.entries.insert(path.to_path_buf(), fingerprint);
                copied += 1;
            }
        }
        copied
    }
}

impl FromIterator<(PathBuf, Option<Fingerprint>)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (PathBuf, Option<Fingerprint>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
