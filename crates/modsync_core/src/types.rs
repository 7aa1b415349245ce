//! Core data model: SyncPaths and file indices.

use crate::path::{normalize, path_key};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// A root-relative file or directory managed by the sync engine.
///
/// Deserializes either from a bare string (all flags at their defaults)
/// or from an object with optional flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSyncPath", rename_all = "camelCase")]
pub struct SyncPath {
    /// Relative path of the file or directory.
    pub path: String,
    /// Whether this path takes part in synchronization.
    pub enabled: bool,
    /// Remote always wins, bypassing local-edit protection and local exclusions.
    pub enforced: bool,
    /// Changes under this path do not need user confirmation.
    pub silent: bool,
    /// Changes under this path require a game restart.
    pub restart_required: bool,
}

impl SyncPath {
    /// Creates an enabled, non-enforced SyncPath.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: normalize(&path.into()),
            enabled: true,
            enforced: false,
            silent: false,
            restart_required: true,
        }
    }

    /// Sets the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the enforced flag.
    pub fn with_enforced(mut self, enforced: bool) -> Self {
        self.enforced = enforced;
        self
    }

    /// Sets the silent flag.
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Sets the restart-required flag.
    pub fn with_restart_required(mut self, restart_required: bool) -> Self {
        self.restart_required = restart_required;
        self
    }

    /// Returns true if `relative` is this path or lies underneath it.
    pub fn contains(&self, relative: &str) -> bool {
        let own = path_key(&self.path);
        let other = path_key(relative);
        own.is_empty() || other == own || other.starts_with(&format!("{own}/"))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSyncPath {
    Bare(String),
    #[serde(rename_all = "camelCase")]
    Full {
        path: String,
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default)]
        enforced: bool,
        #[serde(default)]
        silent: bool,
        #[serde(default = "default_true")]
        restart_required: bool,
    },
}

fn default_true() -> bool {
    true
}

impl From<RawSyncPath> for SyncPath {
    fn from(raw: RawSyncPath) -> Self {
        match raw {
            RawSyncPath::Bare(path) => SyncPath::new(path),
            RawSyncPath::Full {
                path,
                enabled,
                enforced,
                silent,
                restart_required,
            } => SyncPath {
                path: normalize(&path),
                enabled,
                enforced,
                silent,
                restart_required,
            },
        }
    }
}

/// Fingerprint of one file, or a marker for an empty directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModFile {
    /// Content fingerprint. Empty for directories.
    pub hash: String,
    /// True when this entry is an empty directory rather than a file.
    #[serde(default, skip_serializing_if = "is_false")]
    pub directory: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ModFile {
    /// Creates a file entry.
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            directory: false,
        }
    }

    /// Creates an empty-directory entry.
    pub fn directory() -> Self {
        Self {
            hash: String::new(),
            directory: true,
        }
    }
}

/// Files of one SyncPath, keyed case-insensitively by relative path.
///
/// The casing of the most recent insert is kept for display and transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModFiles {
    entries: BTreeMap<String, (String, ModFile)>,
}

impl ModFiles {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, replacing any entry with the same case-insensitive path.
    pub fn insert(&mut self, path: impl AsRef<str>, file: ModFile) -> Option<ModFile> {
        let path = normalize(path.as_ref());
        self.entries
            .insert(path.to_lowercase(), (path, file))
            .map(|(_, old)| old)
    }

    /// Looks up an entry by path, ignoring case.
    pub fn get(&self, path: &str) -> Option<&ModFile> {
        self.entries.get(&path_key(path)).map(|(_, file)| file)
    }

    /// Looks up an entry and returns its stored casing too.
    pub fn get_entry(&self, path: &str) -> Option<(&str, &ModFile)> {
        self.entries
            .get(&path_key(path))
            .map(|(stored, file)| (stored.as_str(), file))
    }

    /// Returns true if an entry exists for the path, ignoring case.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&path_key(path))
    }

    /// Removes an entry by path, ignoring case.
    pub fn remove(&mut self, path: &str) -> Option<ModFile> {
        self.entries.remove(&path_key(path)).map(|(_, file)| file)
    }

    /// Returns the number of entries (files and directories).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in case-insensitive path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModFile)> {
        self.entries
            .values()
            .map(|(path, file)| (path.as_str(), file))
    }

    /// Iterates file entries only, skipping directory markers.
    pub fn files(&self) -> impl Iterator<Item = (&str, &ModFile)> {
        self.iter().filter(|(_, file)| !file.directory)
    }

    /// Iterates directory markers only.
    pub fn directories(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, file)| file.directory)
            .map(|(path, _)| path)
    }

    /// Returns true if `dir` is present as an entry or is an ancestor of one.
    pub fn has_directory(&self, dir: &str) -> bool {
        let key = path_key(dir);
        let prefix = format!("{key}/");
        self.entries.contains_key(&key)
            || self
                .entries
                .range(prefix.clone()..)
                .next()
                .is_some_and(|(k, _)| k.starts_with(&prefix))
    }
}

impl<P: AsRef<str>> FromIterator<(P, ModFile)> for ModFiles {
    fn from_iter<I: IntoIterator<Item = (P, ModFile)>>(iter: I) -> Self {
        let mut files = ModFiles::new();
        for (path, file) in iter {
            files.insert(path, file);
        }
        files
    }
}

impl Serialize for ModFiles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for ModFiles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, ModFile>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

/// File index for a whole tree: SyncPath → relative path → [`ModFile`].
///
/// SyncPath keys are matched the same way as relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModFileIndex {
    paths: BTreeMap<String, (String, ModFiles)>,
}

impl ModFileIndex {
    /// Creates an empty index. This is the valid first-run snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the files of one SyncPath.
    pub fn insert(&mut self, sync_path: &str, files: ModFiles) -> Option<ModFiles> {
        let path = normalize(sync_path);
        self.paths
            .insert(path.to_lowercase(), (path, files))
            .map(|(_, old)| old)
    }

    /// Returns the files of one SyncPath.
    pub fn get(&self, sync_path: &str) -> Option<&ModFiles> {
        self.paths.get(&path_key(sync_path)).map(|(_, files)| files)
    }

    /// Returns a mutable handle to a SyncPath's files, creating it if absent.
    pub fn entry(&mut self, sync_path: &str) -> &mut ModFiles {
        let path = normalize(sync_path);
        &mut self
            .paths
            .entry(path.to_lowercase())
            .or_insert_with(|| (path, ModFiles::new()))
            .1
    }

    /// Iterates SyncPaths and their files.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModFiles)> {
        self.paths
            .values()
            .map(|(path, files)| (path.as_str(), files))
    }

    /// Number of SyncPaths in the index.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if the index holds no SyncPaths.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Total number of file entries across all SyncPaths.
    pub fn file_count(&self) -> usize {
        self.paths
            .values()
            .map(|(_, files)| files.files().count())
            .sum()
    }
}

impl Serialize for ModFileIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for ModFileIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, ModFiles>::deserialize(deserializer)?;
        let mut index = ModFileIndex::new();
        for (path, files) in raw {
            index.insert(&path, files);
        }
        Ok(index)
    }
}
