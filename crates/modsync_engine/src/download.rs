//! Download orchestrator.
//!
//! Fetches files with a concurrency cap, retries transient failures with a
//! fixed delay and stops promptly on cancellation. Each file is written to
//! a temporary sibling and renamed into place once complete, so an
//! interrupted transfer never leaves a truncated file behind.
//!
//! The per-attempt timeout is handed to the transport, which applies it
//! to the wait for a response and to each stall in the body. A large file
//! that keeps streaming is never cut off.

use crate::config::RetryConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::ModSyncTransport;
use modsync_core::resolve_within;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Suffix of in-progress downloads.
pub const PARTIAL_SUFFIX: &str = ".modsync-part";

/// Exclusion pattern hiding in-progress downloads from local scans.
pub const PARTIAL_PATTERN: &str = "**/*.modsync-part";

/// One file moving from the remote into the local tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Relative path, in the remote's casing.
    pub relative: String,
    /// Attempts made so far.
    pub attempt: u32,
}

impl DownloadTask {
    /// Creates a task that has not been attempted yet.
    pub fn new(relative: impl Into<String>) -> Self {
        Self {
            relative: relative.into(),
            attempt: 0,
        }
    }
}

/// Summary of a download run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// Files written, in completion order.
    pub downloaded: Vec<String>,
    /// Total bytes written.
    pub bytes: u64,
    /// Attempts beyond the first, across all files.
    pub retries: u64,
    /// True if the run stopped early because it was cancelled.
    pub cancelled: bool,
}

enum Outcome {
    Done {
        relative: String,
        bytes: u64,
        attempts: u32,
    },
    Cancelled,
}

/// Everything a download task needs, cloned into each task.
struct TaskContext<T> {
    transport: Arc<T>,
    semaphore: Arc<Semaphore>,
    token: CancellationToken,
    root: PathBuf,
    retry: RetryConfig,
}

/// Runs downloads into a destination root.
pub struct Downloader<T: ModSyncTransport + 'static> {
    transport: Arc<T>,
    destination: PathBuf,
    concurrency: usize,
    retry: RetryConfig,
}

impl<T: ModSyncTransport + 'static> Downloader<T> {
    /// Creates a downloader.
    pub fn new(
        transport: Arc<T>,
        destination: impl Into<PathBuf>,
        concurrency: usize,
        retry: RetryConfig,
    ) -> Self {
        Self {
            transport,
            destination: destination.into(),
            concurrency: concurrency.max(1),
            retry,
        }
    }

    /// Downloads every file.
    ///
    /// At most `concurrency` transfers run at once. A file that still
    /// fails after the last attempt fails the whole run and stops the
    /// other transfers. Cancellation is not a failure: the report comes
    /// back with `cancelled` set and completed files are left in place.
    pub async fn run(
        &self,
        files: Vec<String>,
        cancel: &CancellationToken,
    ) -> SyncResult<DownloadReport> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let run_token = cancel.child_token();
        let mut tasks = JoinSet::new();

        let total = files.len();
        for relative in files {
            let context = TaskContext {
                transport: Arc::clone(&self.transport),
                semaphore: Arc::clone(&semaphore),
                token: run_token.clone(),
                root: self.destination.clone(),
                retry: self.retry.clone(),
            };
            tasks.spawn(download_one(context, DownloadTask::new(relative)));
        }

        let mut report = DownloadReport::default();
        let mut failure: Option<SyncError> = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| SyncError::Io(e.into())).and_then(|r| r);
            match result {
                Ok(Outcome::Done {
                    relative,
                    bytes,
                    attempts,
                }) => {
                    report.bytes += bytes;
                    report.retries += u64::from(attempts.saturating_sub(1));
                    report.downloaded.push(relative);
                }
                Ok(Outcome::Cancelled) => {}
                Err(e) => {
                    if failure.is_none() {
                        error!(error = %e, "download failed, stopping remaining transfers");
                        run_token.cancel();
                        failure = Some(e);
                    }
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        report.cancelled = cancel.is_cancelled() && report.downloaded.len() < total;
        info!(
            downloaded = report.downloaded.len(),
            total,
            bytes = report.bytes,
            retries = report.retries,
            cancelled = report.cancelled,
            "downloads finished"
        );
        Ok(report)
    }
}

/// Temporary sibling a file is streamed into.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = ?path, error = %e, "could not remove partial download");
        }
    }
}

async fn download_one<T: ModSyncTransport>(
    context: TaskContext<T>,
    mut task: DownloadTask,
) -> SyncResult<Outcome> {
    let TaskContext {
        transport,
        semaphore,
        token,
        root,
        retry,
    } = context;

    let target = resolve_within(&root, &task.relative)?;
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if token.is_cancelled() {
        return Ok(Outcome::Cancelled);
    }
    // Released on every return below.
    let _permit = tokio::select! {
        _ = token.cancelled() => return Ok(Outcome::Cancelled),
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return Ok(Outcome::Cancelled),
        },
    };

    let partial = partial_path(&target);
    let mut last_error = None;

    while task.attempt < retry.max_attempts {
        let delay = retry.delay_for_attempt(task.attempt);
        if !delay.is_zero() {
            tokio::select! {
                _ = token.cancelled() => {
                    discard(&partial).await;
                    return Ok(Outcome::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if token.is_cancelled() {
            discard(&partial).await;
            return Ok(Outcome::Cancelled);
        }

        let timeout = retry.timeout_for_attempt(task.attempt);
        task.attempt += 1;
        let result = tokio::select! {
            _ = token.cancelled() => {
                discard(&partial).await;
                return Ok(Outcome::Cancelled);
            }
            fetched = transport.fetch(&task.relative, timeout, &partial) => fetched,
        };
        let result = match result {
            Ok(bytes) => tokio::fs::rename(&partial, &target)
                .await
                .map(|()| bytes)
                .map_err(SyncError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(bytes) => {
                debug!(path = %task.relative, bytes, attempts = task.attempt, "downloaded");
                return Ok(Outcome::Done {
                    relative: task.relative,
                    bytes,
                    attempts: task.attempt,
                });
            }
            Err(e) if e.is_retryable() => {
                discard(&partial).await;
                warn!(
                    path = %task.relative,
                    attempt = task.attempt,
                    max_attempts = retry.max_attempts,
                    error = %e,
                    "download attempt failed"
                );
                last_error = Some(e);
            }
            Err(e) => {
                discard(&partial).await;
                return Err(e);
            }
        }
    }

    discard(&partial).await;
    Err(SyncError::DownloadFailed {
        path: task.relative,
        attempts: task.attempt,
        message: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}
