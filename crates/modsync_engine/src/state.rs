//! Sync session state machine.

use crate::config::SyncConfig;
use crate::download::{Downloader, PARTIAL_PATTERN};
use crate::error::{SyncError, SyncResult};
use crate::store::StateStore;
use crate::transport::ModSyncTransport;
use modsync_core::{
    diff, nosync_marked, path_key, resolve_within, DiffResult, ExclusionSet, ModFileIndex,
    ModFiles, ScanOptions, Scanner, SyncPath,
};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The current state of a sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Session is idle, not syncing.
    Idle,
    /// Fetching the server version, SyncPaths and remote index.
    Connecting,
    /// Scanning the local tree and computing the diff.
    Scanning,
    /// Creating directories, downloading and removing files.
    Downloading,
    /// The last cycle completed.
    Synced,
    /// The last cycle failed.
    Error,
    /// The last cycle was cancelled.
    Cancelled,
}

impl SyncState {
    /// Returns true if a cycle is in progress.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::Connecting | SyncState::Scanning | SyncState::Downloading
        )
    }

    /// Returns true if a new cycle may start.
    pub fn can_start_sync(&self) -> bool {
        !self.is_active()
    }
}

/// Statistics accumulated across sync cycles.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Cycles that completed successfully.
    pub cycles_completed: u64,
    /// Cycles stopped by cancellation.
    pub cycles_cancelled: u64,
    /// Files downloaded.
    pub files_downloaded: u64,
    /// Bytes downloaded.
    pub bytes_downloaded: u64,
    /// Local files deleted because they vanished remotely.
    pub files_removed: u64,
    /// Download attempts beyond the first.
    pub retries: u64,
    /// Completion time of the last successful cycle.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Everything learned before any file is touched.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    /// Version reported by the server.
    pub server_version: String,
    /// SyncPaths advertised by the server.
    pub sync_paths: Vec<SyncPath>,
    /// Remote index, after local exclusions and no-sync markers.
    pub remote: ModFileIndex,
    /// Local index.
    pub local: ModFileIndex,
    /// Snapshot of the last applied sync, filtered like `remote`.
    pub previous: ModFileIndex,
    /// Changes to apply.
    pub diff: DiffResult,
}

impl SyncPlan {
    /// Returns true if there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.diff.is_empty()
    }

    /// True when a change touches a SyncPath that is not silent.
    pub fn needs_confirmation(&self) -> bool {
        self.diff.needs_confirmation(&self.sync_paths)
    }

    /// True when a change touches a SyncPath that requires a restart.
    pub fn restart_required(&self) -> bool {
        self.diff.restart_required(&self.sync_paths)
    }

    /// Snapshot to persist once the plan is fully applied.
    ///
    /// Enabled SyncPaths record the remote state, which now matches local
    /// or was deliberately left alone. Disabled SyncPaths keep their
    /// previous record.
    pub fn next_snapshot(&self) -> ModFileIndex {
        let mut next = ModFileIndex::new();
        for sync_path in &self.sync_paths {
            let source = if sync_path.enabled {
                &self.remote
            } else {
                &self.previous
            };
            if let Some(files) = source.get(&sync_path.path) {
                next.insert(&sync_path.path, files.clone());
            }
        }
        next
    }
}

/// Result of a sync cycle.
#[derive(Debug, Clone)]
pub struct SyncCycleResult {
    /// Version reported by the server.
    pub server_version: String,
    /// Changes that were planned.
    pub diff: DiffResult,
    /// Files downloaded.
    pub downloaded: Vec<String>,
    /// Bytes downloaded.
    pub bytes: u64,
    /// Download attempts beyond the first.
    pub retries: u64,
    /// Local files deleted.
    pub removed: Vec<String>,
    /// Directories created.
    pub directories_created: usize,
    /// A change touched a SyncPath that requires a restart.
    pub restart_required: bool,
    /// A change touched a SyncPath that is not silent.
    pub needs_confirmation: bool,
    /// The cycle stopped early because it was cancelled.
    pub cancelled: bool,
    /// Whether the cycle completed and the snapshot was saved.
    pub success: bool,
    /// Duration of the cycle.
    pub duration: Duration,
}

impl SyncCycleResult {
    fn new(server_version: String, diff: DiffResult) -> Self {
        Self {
            server_version,
            diff,
            downloaded: Vec::new(),
            bytes: 0,
            retries: 0,
            removed: Vec::new(),
            directories_created: 0,
            restart_required: false,
            needs_confirmation: false,
            cancelled: false,
            success: false,
            duration: Duration::ZERO,
        }
    }

    fn cancelled(duration: Duration) -> Self {
        let mut result = Self::new(String::new(), DiffResult::default());
        result.cancelled = true;
        result.duration = duration;
        result
    }
}

/// Drives sync cycles against one server.
///
/// A cycle fetches the remote state, scans the local tree, diffs both
/// against the previous snapshot and applies the result. The snapshot is
/// only replaced after every transfer succeeded.
pub struct SyncSession<T: ModSyncTransport + 'static> {
    config: SyncConfig,
    transport: Arc<T>,
    store: StateStore,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    cancel: Mutex<CancellationToken>,
}

impl<T: ModSyncTransport + 'static> SyncSession<T> {
    /// Creates a new session.
    pub fn new(config: SyncConfig, transport: T) -> Self {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    /// Creates a session over a transport that is also used elsewhere.
    pub fn with_shared_transport(config: SyncConfig, transport: Arc<T>) -> Self {
        Self {
            store: StateStore::from_config(&config),
            config,
            transport,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the persisted state store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Cancels the running cycle.
    ///
    /// Transfers in flight are abandoned, no new ones start and the
    /// snapshot is left untouched. Completed files stay on disk.
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    fn reset_cancel(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        token
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    fn begin(&self, next: SyncState) -> SyncResult<()> {
        let mut state = self.state.write();
        if !state.can_start_sync() {
            return Err(SyncError::InvalidStateTransition {
                from: format!("{:?}", *state),
                to: format!("{next:?}"),
            });
        }
        *state = next;
        Ok(())
    }

    /// Fetches the remote state and computes the changes without applying them.
    pub async fn plan(&self) -> SyncResult<SyncPlan> {
        self.begin(SyncState::Connecting)?;
        let token = self.reset_cancel();
        match self.build_plan(&token).await {
            Ok(plan) => {
                self.set_state(SyncState::Idle);
                Ok(plan)
            }
            Err(e) => {
                self.handle_error(&e);
                Err(e)
            }
        }
    }

    /// Applies a plan obtained from [`plan`](Self::plan).
    pub async fn apply(&self, plan: &SyncPlan) -> SyncResult<SyncCycleResult> {
        self.begin(SyncState::Downloading)?;
        let token = self.reset_cancel();
        let start = Instant::now();
        self.finish(self.apply_plan(plan, &token).await, start)
    }

    /// Performs a full sync cycle.
    ///
    /// Cancellation is not an error: the result comes back with
    /// `cancelled` set.
    pub async fn sync(&self) -> SyncResult<SyncCycleResult> {
        self.begin(SyncState::Connecting)?;
        let token = self.reset_cancel();
        let start = Instant::now();

        let outcome = match self.build_plan(&token).await {
            Ok(plan) => {
                self.set_state(SyncState::Downloading);
                self.apply_plan(&plan, &token).await
            }
            Err(e) => Err(e),
        };
        self.finish(outcome, start)
    }

    fn finish(
        &self,
        outcome: SyncResult<SyncCycleResult>,
        start: Instant,
    ) -> SyncResult<SyncCycleResult> {
        let mut result = match outcome {
            Ok(result) => result,
            Err(SyncError::Cancelled) => SyncCycleResult::cancelled(start.elapsed()),
            Err(e) => {
                self.handle_error(&e);
                return Err(e);
            }
        };
        result.duration = start.elapsed();

        let mut stats = self.stats.write();
        stats.files_downloaded += result.downloaded.len() as u64;
        stats.bytes_downloaded += result.bytes;
        stats.files_removed += result.removed.len() as u64;
        stats.retries += result.retries;
        if result.cancelled {
            stats.cycles_cancelled += 1;
            drop(stats);
            self.set_state(SyncState::Cancelled);
            info!(downloaded = result.downloaded.len(), "sync cancelled");
        } else {
            stats.cycles_completed += 1;
            stats.last_sync_time = Some(Instant::now());
            stats.last_error = None;
            drop(stats);
            self.set_state(SyncState::Synced);
            info!(
                downloaded = result.downloaded.len(),
                removed = result.removed.len(),
                restart_required = result.restart_required,
                duration_ms = result.duration.as_millis() as u64,
                "sync complete"
            );
        }
        Ok(result)
    }

    async fn build_plan(&self, token: &CancellationToken) -> SyncResult<SyncPlan> {
        let root = self.config.game_root.as_path();

        let server_version = until_cancelled(token, self.transport.version()).await??;
        let sync_paths = until_cancelled(token, self.transport.sync_paths()).await??;
        let enabled: Vec<String> = sync_paths
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.path.clone())
            .collect();
        for sync_path in sync_paths.iter().filter(|p| !p.enabled) {
            debug!(sync_path = %sync_path.path, "sync path disabled");
        }
        let remote = if enabled.is_empty() {
            ModFileIndex::new()
        } else {
            until_cancelled(token, self.transport.hashes(&enabled)).await??
        };
        info!(
            server_version = %server_version,
            sync_paths = sync_paths.len(),
            remote_files = remote.file_count(),
            "fetched remote state"
        );

        self.set_state(SyncState::Scanning);
        let local_exclusions = self.store.load_exclusions().await?;
        let previous = self.store.load_previous().await?;

        let scanner = Scanner::with_options(
            root,
            ScanOptions::default().with_concurrency(self.config.scan_concurrency),
        );
        let hidden = ExclusionSet::remote_defaults().with_pattern(PARTIAL_PATTERN)?;
        let local = until_cancelled(
            token,
            scanner.scan(&sync_paths, &hidden, &local_exclusions),
        )
        .await??;

        let remote = retain(&remote, &sync_paths, |sync_path, relative| {
            let safe = is_safe_remote_path(root, sync_path, relative);
            if !safe {
                warn!(sync_path = %sync_path.path, path = %relative, "ignoring remote entry outside its sync path");
            }
            safe && locally_tracked(root, sync_path, &local_exclusions, relative)
        });
        let previous = retain(&previous, &sync_paths, |sync_path, relative| {
            locally_tracked(root, sync_path, &local_exclusions, relative)
        });

        let diff = diff(&sync_paths, &local, &remote, &previous);
        debug!(
            downloads = diff.downloads().len(),
            removed = diff.removed().len(),
            directories = diff.created_directories().len(),
            "computed diff"
        );

        Ok(SyncPlan {
            server_version,
            sync_paths,
            remote,
            local,
            previous,
            diff,
        })
    }

    async fn apply_plan(
        &self,
        plan: &SyncPlan,
        token: &CancellationToken,
    ) -> SyncResult<SyncCycleResult> {
        let root = self.config.game_root.as_path();
        let mut result = SyncCycleResult::new(plan.server_version.clone(), plan.diff.clone());
        result.restart_required = plan.restart_required();
        result.needs_confirmation = plan.needs_confirmation();

        for dir in plan.diff.created_directories() {
            let path = resolve_within(root, &dir)?;
            tokio::fs::create_dir_all(&path).await?;
            debug!(path = %dir, "created directory");
            result.directories_created += 1;
        }

        let downloader = Downloader::new(
            Arc::clone(&self.transport),
            root,
            self.config.concurrency,
            self.config.retry.clone(),
        );
        let report = downloader.run(plan.diff.downloads(), token).await?;
        result.downloaded = report.downloaded;
        result.bytes = report.bytes;
        result.retries = report.retries;
        if report.cancelled || token.is_cancelled() {
            result.cancelled = true;
            return Ok(result);
        }

        let removed = plan.diff.removed();
        if self.config.delete_removed_files {
            for relative in removed {
                let path = resolve_within(root, &relative)?;
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        debug!(path = %relative, "removed file");
                        result.removed.push(relative);
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        } else if !removed.is_empty() {
            info!(count = removed.len(), "keeping files removed on the server");
        }

        self.store.save_previous(&plan.next_snapshot()).await?;
        result.success = true;
        Ok(result)
    }

    fn handle_error(&self, error: &SyncError) {
        if error.is_cancelled() {
            self.set_state(SyncState::Cancelled);
            return;
        }
        error!(error = %error, "sync failed");
        self.set_state(SyncState::Error);
        self.stats.write().last_error = Some(error.to_string());
    }
}

async fn until_cancelled<F: Future>(token: &CancellationToken, future: F) -> SyncResult<F::Output> {
    tokio::select! {
        _ = token.cancelled() => Err(SyncError::Cancelled),
        output = future => Ok(output),
    }
}

/// Keeps entries of known SyncPaths for which `keep` holds.
///
/// Entries of SyncPaths the server no longer advertises pass through.
fn retain(
    index: &ModFileIndex,
    sync_paths: &[SyncPath],
    keep: impl Fn(&SyncPath, &str) -> bool,
) -> ModFileIndex {
    let mut retained = ModFileIndex::new();
    for (name, files) in index.iter() {
        let key = path_key(name);
        let filtered: ModFiles = match sync_paths.iter().find(|p| path_key(&p.path) == key) {
            Some(sync_path) => files
                .iter()
                .filter(|(relative, _)| keep(sync_path, relative))
                .map(|(relative, file)| (relative, file.clone()))
                .collect(),
            None => files.clone(),
        };
        retained.insert(name, filtered);
    }
    retained
}

fn is_safe_remote_path(root: &Path, sync_path: &SyncPath, relative: &str) -> bool {
    !relative.split(['/', '\\']).any(|segment| segment == "..")
        && resolve_within(root, relative).is_ok()
        && sync_path.contains(relative)
}

/// No-sync markers always apply. Local exclusions apply unless the
/// SyncPath is enforced, matching what the scanner indexes.
fn locally_tracked(
    root: &Path,
    sync_path: &SyncPath,
    exclusions: &ExclusionSet,
    relative: &str,
) -> bool {
    !nosync_marked(root, relative) && (sync_path.enforced || !exclusions.is_excluded(relative))
}
