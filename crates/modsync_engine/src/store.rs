//! Persisted client state under the game root.
//!
//! Two JSON documents live in the state directory: the snapshot of the
//! last applied sync and the user's local exclusion patterns. A missing
//! document is a valid first-run state.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use modsync_core::{ExclusionSet, ModFileIndex};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the previous-sync snapshot.
pub const PREVIOUS_SYNC_FILE: &str = "PreviousSync.json";
/// File name of the local exclusion patterns.
pub const EXCLUSIONS_FILE: &str = "Exclusions.json";

/// Reads and writes the client's persisted state.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Creates a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a store at the config's state directory.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.state_dir())
    }

    /// The state directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads the previous snapshot, or an empty index on first run.
    pub async fn load_previous(&self) -> SyncResult<ModFileIndex> {
        Ok(self.read(PREVIOUS_SYNC_FILE).await?.unwrap_or_default())
    }

    /// Replaces the previous snapshot.
    pub async fn save_previous(&self, index: &ModFileIndex) -> SyncResult<()> {
        self.write(PREVIOUS_SYNC_FILE, index).await
    }

    /// Loads the raw local exclusion patterns.
    pub async fn load_exclusion_patterns(&self) -> SyncResult<Vec<String>> {
        Ok(self.read(EXCLUSIONS_FILE).await?.unwrap_or_default())
    }

    /// Loads and compiles the local exclusion patterns.
    pub async fn load_exclusions(&self) -> SyncResult<ExclusionSet> {
        let patterns = self.load_exclusion_patterns().await?;
        Ok(ExclusionSet::new(&patterns)?)
    }

    /// Replaces the local exclusion patterns.
    pub async fn save_exclusions(&self, patterns: &[String]) -> SyncResult<()> {
        self.write(EXCLUSIONS_FILE, patterns).await
    }

    async fn read<T: DeserializeOwned>(&self, name: &str) -> SyncResult<Option<T>> {
        let path = self.dir.join(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?path, "no persisted state");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| SyncError::Protocol(format!("corrupt {name}: {e}")))
    }

    async fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> SyncResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| SyncError::Protocol(format!("cannot encode {name}: {e}")))?;

        let path = self.dir.join(name);
        let temp = self.dir.join(format!("{name}.tmp"));
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &path).await?;
        debug!(path = ?path, bytes = bytes.len(), "saved state");
        Ok(())
    }
}
