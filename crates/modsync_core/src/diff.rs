//! Three-way diff between the previous snapshot, the local tree and the
//! remote tree.
//!
//! Pure: no I/O, inputs are treated as immutable.

use crate::path::path_key;
use crate::types::{ModFile, ModFileIndex, ModFiles, SyncPath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Categorized changes for one SyncPath.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathChanges {
    /// Present remotely, absent locally.
    pub added: Vec<String>,
    /// Present on both sides with different content, safe to overwrite.
    pub updated: Vec<String>,
    /// Present locally or in the previous snapshot, gone remotely.
    pub removed: Vec<String>,
    /// Empty remote directories missing locally.
    pub created_directories: Vec<String>,
}

impl PathChanges {
    /// Returns true if nothing needs to happen for this SyncPath.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.created_directories.is_empty()
    }

    /// Files that must be fetched: added then updated.
    pub fn downloads(&self) -> impl Iterator<Item = &str> {
        self.added.iter().chain(&self.updated).map(String::as_str)
    }
}

/// Result of [`diff`]: one [`PathChanges`] per enabled SyncPath.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiffResult {
    changes: BTreeMap<String, PathChanges>,
}

impl DiffResult {
    /// Returns the changes for a SyncPath.
    pub fn get(&self, sync_path: &str) -> Option<&PathChanges> {
        self.changes.get(sync_path)
    }

    /// Iterates SyncPaths and their changes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PathChanges)> {
        self.changes.iter().map(|(path, changes)| (path.as_str(), changes))
    }

    /// Returns true if no SyncPath has any change.
    pub fn is_empty(&self) -> bool {
        self.changes.values().all(PathChanges::is_empty)
    }

    /// All files to fetch across SyncPaths.
    pub fn downloads(&self) -> Vec<String> {
        self.changes
            .values()
            .flat_map(|c| c.downloads().map(str::to_string))
            .collect()
    }

    /// All removal candidates across SyncPaths.
    pub fn removed(&self) -> Vec<String> {
        self.changes
            .values()
            .flat_map(|c| c.removed.iter().cloned())
            .collect()
    }

    /// All directories to create across SyncPaths.
    pub fn created_directories(&self) -> Vec<String> {
        self.changes
            .values()
            .flat_map(|c| c.created_directories.iter().cloned())
            .collect()
    }

    /// True when a change touches a SyncPath that is not silent.
    pub fn needs_confirmation(&self, sync_paths: &[SyncPath]) -> bool {
        self.any_changed(sync_paths, |p| !p.silent)
    }

    /// True when a change touches a SyncPath that requires a restart.
    pub fn restart_required(&self, sync_paths: &[SyncPath]) -> bool {
        self.any_changed(sync_paths, |p| p.restart_required)
    }

    fn any_changed(&self, sync_paths: &[SyncPath], pred: impl Fn(&SyncPath) -> bool) -> bool {
        sync_paths
            .iter()
            .filter(|p| pred(p))
            .any(|p| self.get(&p.path).is_some_and(|c| !c.is_empty()))
    }
}

/// Whether a local file that differs from remote may be overwritten.
///
/// Enforced SyncPaths always overwrite. Otherwise the local copy must be
/// unchanged since the last sync. A missing previous record protects the
/// local file.
fn should_overwrite(sync_path: &SyncPath, local: &ModFile, previous: Option<&ModFile>) -> bool {
    sync_path.enforced || previous.is_some_and(|p| !p.directory && p.hash == local.hash)
}

fn file<'a>(files: &'a ModFiles, path: &str) -> Option<&'a ModFile> {
    files.get(path).filter(|f| !f.directory)
}

/// Reconciles previous, local and remote indices.
///
/// Disabled SyncPaths produce no entry. Output paths keep the remote's
/// casing for added and updated files.
pub fn diff(
    sync_paths: &[SyncPath],
    local: &ModFileIndex,
    remote: &ModFileIndex,
    previous: &ModFileIndex,
) -> DiffResult {
    let empty = ModFiles::new();
    let mut result = DiffResult::default();

    for sync_path in sync_paths.iter().filter(|p| p.enabled) {
        let local_files = local.get(&sync_path.path).unwrap_or(&empty);
        let remote_files = remote.get(&sync_path.path).unwrap_or(&empty);
        let previous_files = previous.get(&sync_path.path).unwrap_or(&empty);

        let mut changes = PathChanges::default();

        for (path, remote_file) in remote_files.files() {
            match file(local_files, path) {
                None => changes.added.push(path.to_string()),
                Some(local_file) if local_file.hash == remote_file.hash => {}
                Some(local_file) => {
                    if should_overwrite(sync_path, local_file, file(previous_files, path)) {
                        changes.updated.push(path.to_string());
                    }
                }
            }
        }

        // Local casing wins over the snapshot's for removal candidates.
        let mut removed = BTreeMap::new();
        for (path, _) in previous_files.files().chain(local_files.files()) {
            if file(remote_files, path).is_none() {
                removed.insert(path_key(path), path.to_string());
            }
        }
        changes.removed = removed.into_values().collect();

        changes.created_directories = remote_files
            .directories()
            .filter(|dir| !local_files.has_directory(dir))
            .map(str::to_string)
            .collect();

        result.changes.insert(sync_path.path.clone(), changes);
    }

    result
}
