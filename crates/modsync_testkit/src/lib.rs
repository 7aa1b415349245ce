//! # ModSync Testkit
//!
//! Test utilities for ModSync.
//!
//! This crate provides:
//! - [`ModTree`], a temporary game directory built file by file
//! - Synthetic indices for benchmarks
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use modsync_testkit::prelude::*;
//!
//! #[test]
//! fn scans_plugins() {
//!     let tree = ModTree::new()
//!         .file("BepInEx/plugins/SAIN.dll", b"sain")
//!         .dir("BepInEx/plugins/TestMod/SuperImportantEmptyFolder");
//!     // ... scan tree.root()
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
