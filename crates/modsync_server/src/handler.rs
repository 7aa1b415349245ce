//! Request handlers for the ModSync endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::http::content_type_for;
use modsync_core::{
    normalize, nosync_marked, path_key, resolve_within, to_native, CoreResult, ExclusionSet,
    ModFile, ModFileIndex, ScanOptions, Scanner, SyncPath,
};
use modsync_protocol::{legacy_hashes, legacy_paths, negotiate, ClientKind, LegacyHash};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Shared state for request handling, built once at start-up.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Compiled exclusions.
    pub exclusions: ExclusionSet,
    scanner: Scanner,
}

impl HandlerContext {
    /// Validates the configuration and builds the context.
    pub fn new(config: ServerConfig) -> CoreResult<Self> {
        let exclusions = config.validate()?;
        let options = ScanOptions::default()
            .with_hash(config.hash)
            .with_concurrency(config.hash_concurrency);
        let scanner = Scanner::with_options(config.root.clone(), options);
        Ok(Self {
            config,
            exclusions,
            scanner,
        })
    }

    /// Classifies a client by its version header.
    pub fn client_kind(&self, version_header: Option<&str>) -> ClientKind {
        negotiate(version_header, &self.config.min_client_version)
    }
}

/// Body of `/modsync/paths`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathsReply {
    /// Full SyncPath descriptors.
    Current(Vec<SyncPath>),
    /// Bare paths of the bootstrap files.
    Legacy(Vec<String>),
}

/// An index whose keys are written with the client path separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireIndex {
    /// The scanned index, keyed with `/`.
    pub index: ModFileIndex,
    /// Separator used on the wire.
    pub separator: char,
}

impl Serialize for WireIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let separator = self.separator;
        serializer.collect_map(self.index.iter().map(|(sync_path, files)| {
            let files: BTreeMap<String, &ModFile> = files
                .iter()
                .map(|(relative, file)| (to_native(relative, separator), file))
                .collect();
            (to_native(sync_path, separator), files)
        }))
    }
}

/// Body of `/modsync/hashes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HashesReply {
    /// Nested index SyncPath → relative path → file.
    Current(WireIndex),
    /// Flat map with never-matching checksums.
    Legacy(BTreeMap<String, LegacyHash>),
}

/// A file resolved for `/modsync/fetch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    /// Normalized relative path.
    pub relative: String,
    /// Absolute path on disk.
    pub path: PathBuf,
    /// File length.
    pub len: u64,
    /// Content type picked from the extension.
    pub content_type: &'static str,
}

/// Handler for ModSync requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles `/modsync/version`.
    pub fn handle_version(&self) -> String {
        self.context.config.server_version.to_string()
    }

    /// Handles `/modsync/paths`.
    pub fn handle_paths(&self, client: &ClientKind) -> PathsReply {
        let separator = self.context.config.client_separator;
        if client.is_legacy() {
            return PathsReply::Legacy(legacy_paths(separator));
        }

        PathsReply::Current(
            self.context
                .config
                .sync_paths
                .iter()
                .map(|p| SyncPath {
                    path: to_native(&p.path, separator),
                    ..p.clone()
                })
                .collect(),
        )
    }

    /// Handles `/modsync/hashes`.
    ///
    /// A non-empty `filter` restricts hashing to the named SyncPaths.
    pub async fn handle_hashes(
        &self,
        client: &ClientKind,
        filter: &[String],
    ) -> ServerResult<HashesReply> {
        if client.is_legacy() {
            return Ok(HashesReply::Legacy(legacy_hashes(
                self.context.config.client_separator,
            )));
        }

        let wanted: HashSet<String> = filter.iter().map(|p| path_key(p)).collect();
        let selected: Vec<SyncPath> = self
            .context
            .config
            .sync_paths
            .iter()
            .filter(|p| wanted.is_empty() || wanted.contains(&path_key(&p.path)))
            .cloned()
            .collect();

        let index = self
            .context
            .scanner
            .scan(&selected, &self.context.exclusions, &ExclusionSet::empty())
            .await?;
        Ok(HashesReply::Current(WireIndex {
            index,
            separator: self.context.config.client_separator,
        }))
    }

    /// Handles `/modsync/fetch/{path}` once the path is decoded.
    ///
    /// The path must resolve inside the root and under an enabled
    /// SyncPath, and must be neither excluded nor no-sync marked.
    pub async fn handle_fetch(&self, relative: &str) -> ServerResult<FetchedFile> {
        let missing = || ServerError::not_found(format!("Attempt to access non-existent path {relative}"));
        let root = &self.context.config.root;

        let path = resolve_within(root, relative).map_err(|_| missing())?;
        let relative = normalize(
            &path
                .strip_prefix(root)
                .map_err(|_| missing())?
                .to_string_lossy(),
        );

        let served = self
            .context
            .config
            .sync_paths
            .iter()
            .any(|p| p.enabled && p.contains(&relative));
        if !served
            || self.context.exclusions.is_excluded(&relative)
            || nosync_marked(root, &relative)
        {
            return Err(missing());
        }

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(missing()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(missing()),
            Err(e) => {
                return Err(ServerError::Internal(format!(
                    "Error reading '{relative}': {e}"
                )))
            }
        };

        debug!(path = %relative, len = metadata.len(), "serving file");
        Ok(FetchedFile {
            content_type: content_type_for(&path),
            relative,
            path,
            len: metadata.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modsync_protocol::{LEGACY_CRC_SENTINEL, MIN_CLIENT_VERSION};
    use modsync_testkit::ModTree;
    use semver::Version;

    fn current() -> ClientKind {
        ClientKind::Current(MIN_CLIENT_VERSION)
    }

    fn handler(tree: &ModTree, sync_paths: Vec<SyncPath>) -> RequestHandler {
        let config = ServerConfig::new(tree.root())
            .with_sync_paths(sync_paths)
            .with_require_bootstrap_files(false);
        RequestHandler::new(Arc::new(HandlerContext::new(config).unwrap()))
    }

    fn sample_tree() -> ModTree {
        ModTree::new()
            .file("BepInEx/plugins/SAIN.dll", b"sain")
            .file("BepInEx/plugins/Corter-ModSync.dll", b"modsync")
            .file("BepInEx/plugins/notes.nosync.txt", b"ignored")
            .file("BepInEx/config/sain.cfg", b"cfg")
            .file("secret.txt", b"secret")
            .dir("BepInEx/plugins/TestMod/SuperImportantEmptyFolder")
    }

    #[test]
    fn version_reports_server_version() {
        let tree = ModTree::new();
        let config = ServerConfig::new(tree.root())
            .with_require_bootstrap_files(false)
            .with_server_version(Version::new(1, 2, 3));
        let handler = RequestHandler::new(Arc::new(HandlerContext::new(config).unwrap()));
        assert_eq!(handler.handle_version(), "1.2.3");
    }

    #[test]
    fn paths_use_client_separator() {
        let tree = sample_tree();
        let handler = handler(
            &tree,
            vec![SyncPath::new("BepInEx/plugins").with_enforced(true)],
        );

        match handler.handle_paths(&current()) {
            PathsReply::Current(paths) => {
                assert_eq!(paths.len(), 1);
                assert_eq!(paths[0].path, "BepInEx\\plugins");
                assert!(paths[0].enforced);
            }
            other => panic!("unexpected reply {other:?}"),
        }

        assert_eq!(
            handler.handle_paths(&ClientKind::Legacy),
            PathsReply::Legacy(vec![
                "BepInEx\\plugins\\Corter-ModSync.dll".into(),
                "ModSync.Updater.exe".into()
            ])
        );
    }

    #[tokio::test]
    async fn hashes_scan_sync_paths() {
        let tree = sample_tree();
        let handler = handler(
            &tree,
            vec![
                SyncPath::new("BepInEx/plugins"),
                SyncPath::new("BepInEx/config"),
            ],
        );

        let HashesReply::Current(WireIndex { index, .. }) =
            handler.handle_hashes(&current(), &[]).await.unwrap()
        else {
            panic!("expected current reply");
        };
        let plugins = index.get("BepInEx/plugins").unwrap();
        assert!(plugins.contains("BepInEx/plugins/SAIN.dll"));
        assert!(!plugins.contains("BepInEx/plugins/notes.nosync.txt"));
        assert_eq!(
            plugins.directories().collect::<Vec<_>>(),
            vec!["BepInEx/plugins/TestMod/SuperImportantEmptyFolder"]
        );
        assert_eq!(index.file_count(), 3);
    }

    #[tokio::test]
    async fn hashes_path_filter() {
        let tree = sample_tree();
        let handler = handler(
            &tree,
            vec![
                SyncPath::new("BepInEx/plugins"),
                SyncPath::new("BepInEx/config"),
            ],
        );

        let reply = handler
            .handle_hashes(&current(), &["bepinex\\CONFIG".to_string()])
            .await
            .unwrap();
        let HashesReply::Current(WireIndex { index, separator }) = reply else {
            panic!("expected current reply");
        };
        assert_eq!(index.len(), 1);
        assert!(index.get("BepInEx/config").is_some());
        assert_eq!(separator, '\\');
    }

    #[tokio::test]
    async fn hashes_use_client_separator_on_the_wire() {
        let tree = sample_tree();
        let handler = handler(&tree, vec![SyncPath::new("BepInEx/config")]);

        let reply = handler.handle_hashes(&current(), &[]).await.unwrap();
        let body = serde_json::to_value(&reply).unwrap();
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["BepInEx\\config"]);
        let files = body["BepInEx\\config"].as_object().unwrap();
        assert_eq!(files.keys().collect::<Vec<_>>(), ["BepInEx\\config\\sain.cfg"]);

        let back: ModFileIndex = serde_json::from_value(body).unwrap();
        assert!(back.get("BepInEx/config").unwrap().contains("BepInEx/config/sain.cfg"));
    }

    #[tokio::test]
    async fn legacy_hashes_are_sentinels() {
        let tree = sample_tree();
        let handler = handler(&tree, vec![SyncPath::new("BepInEx/plugins")]);
        let HashesReply::Legacy(map) = handler.handle_hashes(&ClientKind::Legacy, &[]).await.unwrap()
        else {
            panic!("expected legacy reply");
        };
        assert_eq!(map.len(), 2);
        assert!(map.values().all(|h| h.crc == LEGACY_CRC_SENTINEL));
    }

    #[tokio::test]
    async fn fetch_resolves_inside_sync_paths() {
        let tree = sample_tree();
        let handler = handler(&tree, vec![SyncPath::new("BepInEx/plugins")]);

        let file = handler.handle_fetch("BepInEx\\plugins\\SAIN.dll").await.unwrap();
        assert_eq!(file.relative, "BepInEx/plugins/SAIN.dll");
        assert_eq!(file.len, 4);
        assert_eq!(file.content_type, "application/octet-stream");
        assert!(file.path.is_file());
    }

    #[tokio::test]
    async fn fetch_rejects_outside_paths() {
        let tree = sample_tree();
        let handler = handler(&tree, vec![SyncPath::new("BepInEx/plugins")]);

        for bad in [
            "secret.txt",
            "BepInEx/plugins/../../secret.txt",
            "BepInEx/plugins/../config/sain.cfg",
            "../outside.txt",
            "/etc/passwd",
            "BepInEx/plugins/missing.dll",
            "BepInEx/plugins/TestMod",
            "BepInEx/plugins/notes.nosync.txt",
        ] {
            let err = handler.handle_fetch(bad).await.unwrap_err();
            assert_eq!(err.status_code(), 404, "{bad} was served");
        }
    }

    #[tokio::test]
    async fn fetch_rejects_disabled_and_marked_files() {
        let tree = sample_tree()
            .file("BepInEx/plugins/Server.dll", b"server")
            .file("BepInEx/plugins/Server.dll.nosync", b"")
            .file("BepInEx/plugins/Private/secret.dll", b"secret")
            .file("BepInEx/plugins/Private/.nosync.txt", b"");
        let handler = handler(
            &tree,
            vec![
                SyncPath::new("BepInEx/plugins"),
                SyncPath::new("BepInEx/config").with_enabled(false),
            ],
        );

        for hidden in [
            "BepInEx/config/sain.cfg",
            "BepInEx/plugins/Server.dll",
            "BepInEx/plugins/Private/secret.dll",
        ] {
            let err = handler.handle_fetch(hidden).await.unwrap_err();
            assert_eq!(err.status_code(), 404, "{hidden} was served");
        }
        assert!(handler.handle_fetch("BepInEx/plugins/SAIN.dll").await.is_ok());
    }
}
