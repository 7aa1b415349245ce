//! Tree scanner: walks SyncPaths and fingerprints every included file.

use crate::error::{CoreError, CoreResult};
use crate::exclusion::{ExclusionSet, NOSYNC_MARKERS};
use crate::hash::{fingerprint, HashConfig};
use crate::path::{normalize, resolve_within};
use crate::types::{ModFile, ModFileIndex, ModFiles, SyncPath};
use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Options for a [`Scanner`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Fingerprint sampling parameters.
    pub hash: HashConfig,
    /// Maximum number of files hashed at once.
    pub concurrency: usize,
}

impl ScanOptions {
    /// Sets the hash config.
    pub fn with_hash(mut self, hash: HashConfig) -> Self {
        self.hash = hash;
        self
    }

    /// Sets the hashing concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            hash: HashConfig::default(),
            concurrency: 8,
        }
    }
}

/// Files and empty directories found under one SyncPath, before hashing.
#[derive(Debug, Default)]
struct Listing {
    files: Vec<(String, PathBuf)>,
    empty_dirs: Vec<String>,
}

/// Builds a [`ModFileIndex`] for a tree rooted at a game directory.
///
/// # Example
///
/// ```no_run
/// # async fn demo() -> modsync_core::CoreResult<()> {
/// use modsync_core::{ExclusionSet, Scanner, SyncPath};
///
/// let scanner = Scanner::new("/games/spt");
/// let index = scanner
///     .scan(
///         &[SyncPath::new("BepInEx/plugins")],
///         &ExclusionSet::remote_defaults(),
///         &ExclusionSet::empty(),
///     )
///     .await?;
/// println!("{} files", index.file_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    options: ScanOptions,
}

impl Scanner {
    /// Creates a scanner with default options.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, ScanOptions::default())
    }

    /// Creates a scanner with explicit options.
    pub fn with_options(root: impl Into<PathBuf>, options: ScanOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Returns the scanned root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scans every enabled SyncPath.
    ///
    /// Local exclusions are ignored for enforced SyncPaths. Fails with
    /// [`CoreError::Config`] if a SyncPath escapes the root.
    pub async fn scan(
        &self,
        sync_paths: &[SyncPath],
        remote_exclusions: &ExclusionSet,
        local_exclusions: &ExclusionSet,
    ) -> CoreResult<ModFileIndex> {
        let mut index = ModFileIndex::new();

        for sync_path in sync_paths.iter().filter(|p| p.enabled) {
            let root = self.root.clone();
            let owned = sync_path.clone();
            let remote = remote_exclusions.clone();
            let local = local_exclusions.clone();
            let listing = tokio::task::spawn_blocking(move || {
                list_sync_path(&root, &owned, &remote, &local)
            })
            .await
            .map_err(|e| CoreError::Task(e.to_string()))??;

            let files = self.hash_listing(listing).await?;
            debug!(sync_path = %sync_path.path, entries = files.len(), "scanned sync path");
            index.insert(&sync_path.path, files);
        }

        info!(root = ?self.root, files = index.file_count(), "scan complete");
        Ok(index)
    }

    async fn hash_listing(&self, listing: Listing) -> CoreResult<ModFiles> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (relative, absolute) in listing.files {
            let semaphore = Arc::clone(&semaphore);
            let config = self.options.hash;
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| CoreError::Task(e.to_string()))?;
                let hash = tokio::task::spawn_blocking(move || fingerprint(&absolute, &config))
                    .await
                    .map_err(|e| CoreError::Task(e.to_string()))??;
                Ok::<_, CoreError>((relative, ModFile::new(hash)))
            });
        }

        let mut files = ModFiles::new();
        while let Some(joined) = tasks.join_next().await {
            let (relative, file) = joined.map_err(|e| CoreError::Task(e.to_string()))??;
            files.insert(relative, file);
        }
        for dir in listing.empty_dirs {
            files.insert(dir, ModFile::directory());
        }
        Ok(files)
    }
}

/// Decides which entries under one SyncPath are included.
struct Filter<'a> {
    root: &'a Path,
    remote: &'a ExclusionSet,
    local: Option<&'a ExclusionSet>,
    /// Directories under which no exclusion pattern can match.
    clean: HashSet<PathBuf>,
}

impl Filter<'_> {
    fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(self.root).unwrap_or(path);
        normalize(&relative.to_string_lossy())
    }

    fn excluded(&self, relative: &str) -> bool {
        self.remote.is_excluded(relative) || self.local.is_some_and(|l| l.is_excluded(relative))
    }

    fn may_exclude_under(&self, relative: &str) -> bool {
        self.remote.is_parent_excluded(relative)
            || self.local.is_some_and(|l| l.is_parent_excluded(relative))
    }

    fn keep(&mut self, entry: &DirEntry) -> bool {
        let path = entry.path();
        let is_dir = entry.file_type().is_dir();

        if has_nosync_marker(path, is_dir) {
            debug!(path = ?path, "skipping no-sync entry");
            return false;
        }

        let parent_clean = path.parent().is_some_and(|p| self.clean.contains(p));
        if !parent_clean {
            let relative = self.relative(path);
            if self.excluded(&relative) {
                return false;
            }
            if is_dir && !self.may_exclude_under(&relative) {
                self.clean.insert(path.to_path_buf());
            }
        } else if is_dir {
            self.clean.insert(path.to_path_buf());
        }
        true
    }
}

fn marker_path(path: &Path, marker: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(marker);
    path.with_file_name(name)
}

fn has_nosync_marker(path: &Path, is_dir: bool) -> bool {
    NOSYNC_MARKERS.iter().any(|marker| {
        if is_dir {
            path.join(marker).is_file()
        } else {
            marker_path(path, marker).exists()
        }
    })
}

/// Returns true if a no-sync marker under `root` covers `relative`.
///
/// The marker may sit next to the entry, inside it when it is a
/// directory, or in any directory between the root and the entry. Paths
/// escaping the root are never marked.
pub fn nosync_marked(root: &Path, relative: &str) -> bool {
    let Ok(path) = resolve_within(root, relative) else {
        return false;
    };
    has_nosync_marker(&path, false)
        || path
            .ancestors()
            .take_while(|dir| *dir != root && dir.starts_with(root))
            .any(|dir| has_nosync_marker(dir, true))
}

fn walk_error(base: &Path, err: walkdir::Error) -> CoreError {
    let path = err.path().unwrap_or(base).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop detected"));
    CoreError::io(path, source)
}

fn list_sync_path(
    root: &Path,
    sync_path: &SyncPath,
    remote: &ExclusionSet,
    local: &ExclusionSet,
) -> CoreResult<Listing> {
    let base = resolve_within(root, &sync_path.path)?;
    let mut listing = Listing::default();

    let metadata = match std::fs::metadata(&base) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(listing),
        Err(e) => return Err(CoreError::io(&base, e)),
    };

    let mut filter = Filter {
        root,
        remote,
        local: (!sync_path.enforced).then_some(local),
        clean: HashSet::new(),
    };

    if metadata.is_file() {
        let relative = filter.relative(&base);
        if !filter.excluded(&relative) && !has_nosync_marker(&base, false) {
            listing.files.push((relative, base));
        }
        return Ok(listing);
    }

    let mut dirs = Vec::new();
    let mut non_empty = HashSet::new();
    let walker = WalkDir::new(&base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || filter.keep(entry));

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(&base, e))?;
        if entry.depth() == 0 {
            dirs.push(entry.path().to_path_buf());
            continue;
        }
        if let Some(parent) = entry.path().parent() {
            non_empty.insert(parent.to_path_buf());
        }
        if entry.file_type().is_dir() {
            dirs.push(entry.path().to_path_buf());
        } else if entry.file_type().is_file() {
            let path = entry.into_path();
            listing.files.push((relative_to(root, &path), path));
        }
    }

    listing.empty_dirs = dirs
        .iter()
        .filter(|dir| !non_empty.contains(*dir))
        .map(|dir| relative_to(root, dir))
        .collect();
    Ok(listing)
}

fn relative_to(root: &Path, path: &Path) -> String {
    normalize(&path.strip_prefix(root).unwrap_or(path).to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, contents: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    async fn scan(root: &Path, paths: &[SyncPath], local: &[&str]) -> ModFileIndex {
        Scanner::new(root)
            .scan(
                paths,
                &ExclusionSet::remote_defaults(),
                &ExclusionSet::new(local).unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn scans_directory_recursively() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugins/SAIN.dll", b"sain");
        write(dir.path(), "plugins/Corter-ModSync.dll", b"modsync");
        write(dir.path(), "plugins/SAIN/config.json", b"{}");

        let index = scan(dir.path(), &[SyncPath::new("plugins")], &[]).await;
        let files = index.get("plugins").unwrap();
        assert_eq!(files.files().count(), 3);
        assert!(files.contains("plugins/SAIN.dll"));
        assert!(files.contains("plugins/sain/CONFIG.json"));
        assert_eq!(files.directories().count(), 0);
    }

    #[tokio::test]
    async fn single_file_sync_path() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "SAIN.dll", b"sain");

        let index = scan(dir.path(), &[SyncPath::new("SAIN.dll")], &[]).await;
        let files = index.get("SAIN.dll").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.contains("SAIN.dll"));
    }

    #[tokio::test]
    async fn missing_and_disabled_paths() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "other/a.dll", b"a");

        let index = scan(
            dir.path(),
            &[
                SyncPath::new("plugins"),
                SyncPath::new("other").with_enabled(false),
            ],
            &[],
        )
        .await;
        assert!(index.get("plugins").unwrap().is_empty());
        assert!(index.get("other").is_none());
    }

    #[tokio::test]
    async fn empty_directories_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugins/TestMod/mod.dll", b"mod");
        fs::create_dir_all(dir.path().join("plugins/TestMod/SuperImportantEmptyFolder")).unwrap();

        let index = scan(dir.path(), &[SyncPath::new("plugins")], &[]).await;
        let files = index.get("plugins").unwrap();
        assert_eq!(
            files.directories().collect::<Vec<_>>(),
            vec!["plugins/TestMod/SuperImportantEmptyFolder"]
        );
        assert_eq!(
            files.get("plugins/TestMod/SuperImportantEmptyFolder"),
            Some(&ModFile::directory())
        );
    }

    #[tokio::test]
    async fn exclusions_and_enforcement() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugins/SAIN/SAIN.dll", b"sain");
        write(dir.path(), "plugins/SAIN/config.txt", b"cfg");
        write(dir.path(), "plugins/SAIN/readme.nosync.txt", b"");

        let local = ["plugins/SAIN/config.txt"];
        let index = scan(dir.path(), &[SyncPath::new("plugins")], &local).await;
        let files = index.get("plugins").unwrap();
        assert!(files.contains("plugins/SAIN/SAIN.dll"));
        assert!(!files.contains("plugins/SAIN/config.txt"));
        assert!(!files.contains("plugins/SAIN/readme.nosync.txt"));

        let enforced = SyncPath::new("plugins").with_enforced(true);
        let index = scan(dir.path(), &[enforced], &local).await;
        let files = index.get("plugins").unwrap();
        assert!(files.contains("plugins/SAIN/config.txt"));
        assert!(!files.contains("plugins/SAIN/readme.nosync.txt"));
    }

    #[tokio::test]
    async fn excluded_directories_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugins/cache/a.bin", b"a");
        write(dir.path(), "plugins/cache/deep/b.bin", b"b");
        write(dir.path(), "plugins/keep.dll", b"k");

        let index = scan(dir.path(), &[SyncPath::new("plugins")], &["plugins/cache/**"]).await;
        let files = index.get("plugins").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.contains("plugins/keep.dll"));
    }

    #[tokio::test]
    async fn nosync_markers() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugins/Private/secret.dll", b"s");
        write(dir.path(), "plugins/Private/.nosync", b"");
        write(dir.path(), "plugins/Server.dll", b"s");
        write(dir.path(), "plugins/Server.dll.nosync", b"");
        write(dir.path(), "plugins/Client.dll", b"c");

        let index = scan(dir.path(), &[SyncPath::new("plugins")], &[]).await;
        let files = index.get("plugins").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.contains("plugins/Client.dll"));
    }

    #[tokio::test]
    async fn traversal_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Scanner::new(dir.path())
            .scan(
                &[SyncPath::new("../outside")],
                &ExclusionSet::empty(),
                &ExclusionSet::empty(),
            )
            .await
            .unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn identical_content_identical_hash() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/x.dll", b"same");
        write(dir.path(), "b/x.dll", b"same");

        let index = scan(dir.path(), &[SyncPath::new("a"), SyncPath::new("b")], &[]).await;
        assert_eq!(
            index.get("a").unwrap().get("a/x.dll"),
            index.get("b").unwrap().get("b/x.dll")
        );
    }

    #[test]
    fn nosync_marks_cover_descendants() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugins/Private/.nosync.txt", b"");
        write(dir.path(), "plugins/Server.dll.nosync", b"");

        assert!(nosync_marked(dir.path(), "plugins/Private/deep/secret.dll"));
        assert!(nosync_marked(dir.path(), "plugins/Server.dll"));
        assert!(!nosync_marked(dir.path(), "plugins/Client.dll"));
        assert!(!nosync_marked(dir.path(), "../plugins/Server.dll"));
    }

    #[tokio::test]
    async fn marked_directory_is_marked_itself() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugins/Mine/.nosync", b"");
        write(dir.path(), "plugins/keep.dll", b"k");

        assert!(nosync_marked(dir.path(), "plugins/Mine"));
        assert!(!nosync_marked(dir.path(), "plugins"));

        let index = scan(dir.path(), &[SyncPath::new("plugins")], &[]).await;
        let files = index.get("plugins").unwrap();
        assert!(!files.contains("plugins/Mine"));
        assert_eq!(files.directories().count(), 0);
    }

    #[tokio::test]
    async fn markers_apply_under_enforced_paths() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugins/Server.dll", b"s");
        write(dir.path(), "plugins/Server.dll.nosync", b"");

        let enforced = SyncPath::new("plugins").with_enforced(true);
        let index = scan(dir.path(), &[enforced], &[]).await;
        assert!(!index.get("plugins").unwrap().contains("plugins/Server.dll"));
        assert!(nosync_marked(dir.path(), "plugins/Server.dll"));
    }
}
