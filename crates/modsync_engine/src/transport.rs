//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use modsync_core::{fingerprint_reader, path_key, HashConfig, ModFile, ModFileIndex, SyncPath};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// A transport handles communication with the ModSync server.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-process loopback, mock for testing).
pub trait ModSyncTransport: Send + Sync {
    /// Fetches the server version.
    fn version(&self) -> impl Future<Output = SyncResult<String>> + Send;

    /// Fetches the SyncPath list.
    fn sync_paths(&self) -> impl Future<Output = SyncResult<Vec<SyncPath>>> + Send;

    /// Fetches the remote index, restricted to `sync_paths` when non-empty.
    fn hashes(&self, sync_paths: &[String]) -> impl Future<Output = SyncResult<ModFileIndex>> + Send;

    /// Streams one remote file into `dest`, returning the bytes written.
    ///
    /// `dest` is created or truncated. A missing remote file is
    /// [`SyncError::NotFound`]. `timeout` bounds the wait for the response
    /// and every gap between body chunks, not the whole transfer; running
    /// out is [`SyncError::Timeout`].
    fn fetch(
        &self,
        relative: &str,
        timeout: Duration,
        dest: &Path,
    ) -> impl Future<Output = SyncResult<u64>> + Send;
}

/// A mock transport for testing.
///
/// Serves an in-memory tree and can inject failures and latency.
#[derive(Debug, Default)]
pub struct MockTransport {
    connected: AtomicBool,
    version: Mutex<String>,
    sync_paths: Mutex<Vec<SyncPath>>,
    index: Mutex<ModFileIndex>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    failures: Mutex<HashMap<String, u32>>,
    latency: Mutex<Duration>,
    transfer_time: Mutex<Duration>,
    timeouts: Mutex<Vec<Duration>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    attempts: AtomicUsize,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockTransport {
    /// Creates a new, connected mock transport with no files.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            version: Mutex::new("0.9.0".into()),
            ..Self::default()
        }
    }

    /// Sets the reported server version.
    pub fn set_version(&self, version: impl Into<String>) {
        *self.version.lock() = version.into();
    }

    /// Sets the SyncPath list.
    pub fn set_sync_paths(&self, sync_paths: Vec<SyncPath>) {
        *self.sync_paths.lock() = sync_paths;
    }

    /// Adds a remote file and indexes it under `sync_path`.
    pub fn add_file(&self, sync_path: &str, relative: &str, contents: impl Into<Vec<u8>>) {
        let contents = contents.into();
        let hash = fingerprint_reader(
            Cursor::new(&contents),
            Path::new(relative),
            &HashConfig::default(),
        )
        .unwrap_or_default();
        self.index
            .lock()
            .entry(sync_path)
            .insert(relative, ModFile::new(hash));
        self.files.lock().insert(path_key(relative), contents);
    }

    /// Adds an empty remote directory.
    pub fn add_directory(&self, sync_path: &str, relative: &str) {
        self.index
            .lock()
            .entry(sync_path)
            .insert(relative, ModFile::directory());
    }

    /// Removes a remote file from the index and the store.
    pub fn remove_file(&self, sync_path: &str, relative: &str) {
        self.index.lock().entry(sync_path).remove(relative);
        self.files.lock().remove(&path_key(relative));
    }

    /// Makes the next `count` fetches of `relative` fail with a retryable error.
    pub fn fail_times(&self, relative: &str, count: u32) {
        self.failures.lock().insert(path_key(relative), count);
    }

    /// Delays the response of every fetch. Subject to the fetch timeout.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Delays the body of every fetch. Not subject to the fetch timeout.
    pub fn set_transfer_time(&self, transfer_time: Duration) {
        *self.transfer_time.lock() = transfer_time;
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Highest number of fetches seen in flight at once.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Total fetch attempts, including failed ones.
    pub fn fetch_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Timeout passed to each fetch attempt, in call order.
    pub fn fetch_timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().clone()
    }

    fn check_connected(&self) -> SyncResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::transport_retryable("not connected"))
        }
    }
}

impl ModSyncTransport for MockTransport {
    async fn version(&self) -> SyncResult<String> {
        self.check_connected()?;
        Ok(self.version.lock().clone())
    }

    async fn sync_paths(&self) -> SyncResult<Vec<SyncPath>> {
        self.check_connected()?;
        Ok(self.sync_paths.lock().clone())
    }

    async fn hashes(&self, sync_paths: &[String]) -> SyncResult<ModFileIndex> {
        self.check_connected()?;
        let index = self.index.lock().clone();
        if sync_paths.is_empty() {
            return Ok(index);
        }
        let mut filtered = ModFileIndex::new();
        for wanted in sync_paths {
            if let Some(files) = index.get(wanted) {
                filtered.insert(wanted, files.clone());
            }
        }
        Ok(filtered)
    }

    async fn fetch(&self, relative: &str, timeout: Duration, dest: &Path) -> SyncResult<u64> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.timeouts.lock().push(timeout);
        self.check_connected()?;

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = ActiveGuard(&self.active);
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::timeout(timeout, tokio::time::sleep(latency))
                .await
                .map_err(|_| SyncError::Timeout)?;
        }

        let key = path_key(relative);
        {
            let mut failures = self.failures.lock();
            if let Some(remaining) = failures.get_mut(&key).filter(|n| **n > 0) {
                *remaining -= 1;
                return Err(SyncError::transport_retryable(format!(
                    "injected failure for {relative}"
                )));
            }
        }

        let contents = self
            .files
            .lock()
            .get(&key)
            .cloned()
            .ok_or_else(|| SyncError::NotFound {
                path: relative.to_string(),
            })?;
        let transfer_time = *self.transfer_time.lock();
        if !transfer_time.is_zero() {
            tokio::time::sleep(transfer_time).await;
        }
        tokio::fs::write(dest, &contents).await?;
        Ok(contents.len() as u64)
    }
}
