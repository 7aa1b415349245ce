//! Server configuration.

use modsync_core::{resolve_within, CoreError, CoreResult, ExclusionSet, HashConfig, SyncPath};
use modsync_protocol::{BOOTSTRAP_FILES, MIN_CLIENT_VERSION};
use semver::Version;
use std::path::PathBuf;

/// Configuration for the ModSync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server game root; every SyncPath is relative to it.
    pub root: PathBuf,
    /// Paths offered to clients.
    pub sync_paths: Vec<SyncPath>,
    /// Exclusion globs applied to every SyncPath.
    pub exclusions: Vec<String>,
    /// Version reported by `/modsync/version`.
    pub server_version: Version,
    /// Clients older than this receive the legacy fallback bodies.
    pub min_client_version: Version,
    /// Fingerprint sampling parameters.
    pub hash: HashConfig,
    /// Maximum number of files hashed at once.
    pub hash_concurrency: usize,
    /// Refuse to start unless the client bootstrap files exist under the root.
    pub require_bootstrap_files: bool,
    /// Separator used for paths sent to clients.
    pub client_separator: char,
}

impl ServerConfig {
    /// Creates a configuration with default settings and no SyncPaths.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sync_paths: Vec::new(),
            exclusions: ExclusionSet::remote_defaults()
                .patterns()
                .map(str::to_string)
                .collect(),
            server_version: Version::new(0, 9, 0),
            min_client_version: MIN_CLIENT_VERSION,
            hash: HashConfig::default(),
            hash_concurrency: 8,
            require_bootstrap_files: true,
            client_separator: '\\',
        }
    }

    /// Sets the SyncPaths.
    pub fn with_sync_paths(mut self, sync_paths: Vec<SyncPath>) -> Self {
        self.sync_paths = sync_paths;
        self
    }

    /// Replaces the exclusion globs.
    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions = exclusions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the reported server version.
    pub fn with_server_version(mut self, version: Version) -> Self {
        self.server_version = version;
        self
    }

    /// Sets the oldest client version served the current protocol.
    pub fn with_min_client_version(mut self, version: Version) -> Self {
        self.min_client_version = version;
        self
    }

    /// Sets the fingerprint parameters.
    pub fn with_hash(mut self, hash: HashConfig) -> Self {
        self.hash = hash;
        self
    }

    /// Sets the hashing concurrency.
    pub fn with_hash_concurrency(mut self, concurrency: usize) -> Self {
        self.hash_concurrency = concurrency.max(1);
        self
    }

    /// Sets whether the bootstrap files must exist.
    pub fn with_require_bootstrap_files(mut self, required: bool) -> Self {
        self.require_bootstrap_files = required;
        self
    }

    /// Sets the separator used for paths sent to clients.
    pub fn with_client_separator(mut self, separator: char) -> Self {
        self.client_separator = separator;
        self
    }

    /// Checks the configuration and compiles the exclusions.
    ///
    /// Fails with [`CoreError::Config`] if a SyncPath is absolute or
    /// escapes the root, or if a required bootstrap file is missing.
    pub fn validate(&self) -> CoreResult<ExclusionSet> {
        for sync_path in &self.sync_paths {
            resolve_within(&self.root, &sync_path.path)?;
        }

        if self.require_bootstrap_files {
            for file in BOOTSTRAP_FILES {
                if !resolve_within(&self.root, file)?.is_file() {
                    return Err(CoreError::Config(format!(
                        "bootstrap file '{file}' is missing under {}",
                        self.root.display()
                    )));
                }
            }
        }

        ExclusionSet::new(&self.exclusions)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
