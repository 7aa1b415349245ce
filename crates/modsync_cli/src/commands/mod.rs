//! CLI command implementations.

pub mod diff;
pub mod hash;
pub mod scan;
pub mod sync;
