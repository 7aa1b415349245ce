//! Ordered sets of exclusion globs.

use crate::error::CoreResult;
use crate::glob::{Glob, GlobMode};

/// Marker suffixes that opt a file or directory out of synchronization.
///
/// A directory holding a file named exactly like a marker is skipped, and a
/// file `F` is skipped when a sibling `F<marker>` exists.
pub const NOSYNC_MARKERS: [&str; 2] = [".nosync", ".nosync.txt"];

/// Patterns that hide the marker files themselves.
const REMOTE_DEFAULTS: [&str; 2] = ["**/*.nosync", "**/*.nosync.txt"];

/// An ordered list of compiled exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    globs: Vec<Glob>,
}

impl ExclusionSet {
    /// Compiles a set from pattern strings.
    pub fn new<I, S>(patterns: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let globs = patterns
            .into_iter()
            .map(|p| Glob::new(p.as_ref()))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { globs })
    }

    /// An empty set that excludes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The fixed remote-side exclusions for no-sync marker files.
    pub fn remote_defaults() -> Self {
        Self {
            globs: REMOTE_DEFAULTS
                .iter()
                .filter_map(|p| Glob::new(p).ok())
                .collect(),
        }
    }

    /// Appends one pattern.
    pub fn with_pattern(mut self, pattern: &str) -> CoreResult<Self> {
        self.globs.push(Glob::new(pattern)?);
        Ok(self)
    }

    /// Returns true if any pattern fully matches `path`.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.globs.iter().any(|g| g.matches(path, GlobMode::Full))
    }

    /// Returns true if `dir` could hold a descendant excluded by any pattern.
    pub fn is_parent_excluded(&self, dir: &str) -> bool {
        self.globs.iter().any(|g| g.matches(dir, GlobMode::Prefix))
    }

    /// Source patterns in order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.globs.iter().map(Glob::pattern)
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.globs.len()
    }

    /// Returns true if the set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }
}
