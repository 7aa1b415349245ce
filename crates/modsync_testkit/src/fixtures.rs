//! On-disk fixtures.
//!
//! Helpers panic on I/O failure; they are only meant for tests.

use modsync_core::{normalize, ModFile, ModFileIndex, ModFiles};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Client plugin and updater, which a server refuses to start without.
pub const BOOTSTRAP_FIXTURES: [(&str, &[u8]); 2] = [
    ("BepInEx/plugins/Corter-ModSync.dll", b"corter-modsync plugin"),
    ("ModSync.Updater.exe", b"modsync updater"),
];

/// A temporary game directory, removed on drop.
pub struct ModTree {
    dir: TempDir,
}

impl ModTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Root of the tree.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a relative entry.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(normalize(relative))
    }

    /// Adds a file, creating parent directories.
    pub fn file(self, relative: &str, contents: impl AsRef<[u8]>) -> Self {
        self.write(relative, contents);
        self
    }

    /// Adds a directory.
    pub fn dir(self, relative: &str) -> Self {
        fs::create_dir_all(self.path(relative)).expect("Failed to create directory");
        self
    }

    /// Adds the bootstrap plugin and updater.
    pub fn with_bootstrap_files(self) -> Self {
        BOOTSTRAP_FIXTURES
            .iter()
            .fold(self, |tree, (path, contents)| tree.file(path, contents))
    }

    /// Writes a file in place, creating parent directories.
    pub fn write(&self, relative: &str, contents: impl AsRef<[u8]>) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(path, contents).expect("Failed to write file");
    }

    /// Reads a file.
    pub fn read(&self, relative: &str) -> Vec<u8> {
        fs::read(self.path(relative)).expect("Failed to read file")
    }

    /// Returns true if a file or directory exists.
    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// Removes a file.
    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.path(relative)).expect("Failed to remove file");
    }

    /// All files under the root as sorted, normalized relative paths.
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = WalkDir::new(self.root())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(self.root())
                    .ok()
                    .map(|p| normalize(&p.to_string_lossy()))
            })
            .collect();
        files.sort();
        files
    }
}

impl Default for ModTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test with a temporary tree.
pub fn with_temp_tree<F, R>(f: F) -> R
where
    F: FnOnce(&ModTree) -> R,
{
    let tree = ModTree::new();
    f(&tree)
}

/// Builds a deterministic index of `count` files spread over one SyncPath.
///
/// `salt` changes every hash so two calls with different salts differ on
/// every file.
pub fn synthetic_index(sync_path: &str, count: usize, salt: u64) -> ModFileIndex {
    let files: ModFiles = (0..count)
        .map(|i| {
            (
                format!("{sync_path}/mod{:03}/file{i:05}.dll", i % 100),
                ModFile::new(format!("{:032x}", (i as u64) ^ salt.rotate_left(17))),
            )
        })
        .collect();
    let mut index = ModFileIndex::new();
    index.insert(sync_path, files);
    index
}
