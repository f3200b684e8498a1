//! Core primitives for scanwatch
//!
//! This crate provides:
//! - BLAKE3 content fingerprints for regular files
//! - Snapshots mapping paths to fingerprints
//! - Per-file change classification and delete detection between snapshots

pub mod hash;
pub mod snapshot;

// Re-exports
pub use hash::{hash_bytes, hash_file, Fingerprint};
pub use snapshot::{Change, Snapshot};
