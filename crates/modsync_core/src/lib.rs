//! # ModSync Core
//!
//! Fingerprinting, scanning and three-way diffing for ModSync.
//!
//! This crate provides:
//! - The data model (`SyncPath`, `ModFile`, `ModFiles`, `ModFileIndex`)
//! - A sampled content fingerprint tuned for large mod archives
//! - A glob matcher for exclusion patterns and routes
//! - A tree scanner that builds a per-SyncPath file index
//! - A pure three-way diff between previous snapshot, local and remote trees
//!
//! ## Architecture
//!
//! Both sides of a sync use the same scanner, so the local and remote
//! indices are directly comparable:
//! 1. The server scans its tree and publishes the remote index
//! 2. The client scans its own tree with the same exclusions
//! 3. The diff reconciles remote, local and the previous snapshot
//!
//! ## Key Invariants
//!
//! - Relative paths are unique under case-insensitive comparison
//! - A path is never both added and updated
//! - Local edits made since the last sync are never overwritten unless
//!   the owning SyncPath is enforced
//! - Diffing an already-synchronized tree yields no changes

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod diff;
mod error;
mod exclusion;
mod glob;
mod hash;
mod path;
mod scan;
mod types;

pub use diff::{diff, DiffResult, PathChanges};
pub use error::{CoreError, CoreResult};
pub use exclusion::{ExclusionSet, NOSYNC_MARKERS};
pub use glob::{Glob, GlobMode};
pub use hash::{fingerprint, fingerprint_reader, HashConfig};
pub use path::{normalize, path_key, resolve_within, to_native};
pub use scan::{nosync_marked, ScanOptions, Scanner};
pub use types::{ModFile, ModFileIndex, ModFiles, SyncPath};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
