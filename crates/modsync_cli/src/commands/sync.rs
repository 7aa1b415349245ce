//! Sync command implementation.

use super::diff::render_text;
use modsync_engine::{HttpTransport, SyncConfig, SyncCycleResult, SyncSession};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Arguments of the sync command.
#[derive(Debug, Clone)]
pub struct SyncArgs {
    /// Server base URL.
    pub server: String,
    /// Game root.
    pub root: PathBuf,
    /// Delete files removed on the server.
    pub delete_removed: bool,
    /// Concurrent downloads.
    pub concurrency: usize,
    /// Plan only.
    pub dry_run: bool,
}

/// Outcome of a sync run, for JSON output.
#[derive(Debug, Serialize)]
pub struct SyncSummary {
    /// Version reported by the server.
    pub server_version: String,
    /// Files downloaded.
    pub downloaded: usize,
    /// Bytes downloaded.
    pub bytes: u64,
    /// Files deleted.
    pub removed: usize,
    /// Files gone from the server but left in place.
    pub kept: usize,
    /// Directories created.
    pub directories_created: usize,
    /// The game must be restarted to load the changes.
    pub restart_required: bool,
    /// The run was cancelled.
    pub cancelled: bool,
    /// Wall-clock time in milliseconds.
    pub duration_ms: u64,
}

impl From<&SyncCycleResult> for SyncSummary {
    fn from(result: &SyncCycleResult) -> Self {
        Self {
            server_version: result.server_version.clone(),
            downloaded: result.downloaded.len(),
            bytes: result.bytes,
            removed: result.removed.len(),
            kept: result.diff.removed().len().saturating_sub(result.removed.len()),
            directories_created: result.directories_created,
            restart_required: result.restart_required,
            cancelled: result.cancelled,
            duration_ms: result.duration.as_millis() as u64,
        }
    }
}

/// Runs the sync command. Ctrl-C cancels the running cycle.
pub async fn run(args: SyncArgs, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = SyncConfig::new(args.server, args.root)
        .with_concurrency(args.concurrency)
        .with_delete_removed_files(args.delete_removed);
    let transport = HttpTransport::from_config(&config)?;
    let session = Arc::new(SyncSession::new(config, transport));

    let canceller = Arc::clone(&session);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling sync");
            canceller.cancel();
        }
    });

    let outcome = run_session(&session, args.dry_run, format).await;
    interrupt.abort();
    outcome
}

async fn run_session(
    session: &SyncSession<HttpTransport>,
    dry_run: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if dry_run {
        let plan = session.plan().await?;
        match format {
            "json" => println!("{}", serde_json::to_string_pretty(&plan.diff)?),
            _ => {
                print!("{}", render_text(&plan.diff));
                if plan.restart_required() {
                    println!("A restart would be required");
                }
            }
        }
        return Ok(());
    }

    let result = session.sync().await?;
    let summary = SyncSummary::from(&result);
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => print_text(&summary),
    }
    Ok(())
}

fn print_text(summary: &SyncSummary) {
    if summary.cancelled {
        println!(
            "Sync cancelled after {} files; run again to finish",
            summary.downloaded
        );
        return;
    }

    println!("Server version: {}", summary.server_version);
    println!(
        "Downloaded {} files ({} bytes), created {} directories",
        summary.downloaded, summary.bytes, summary.directories_created
    );
    if summary.removed > 0 {
        println!("Removed {} files", summary.removed);
    }
    if summary.kept > 0 {
        println!(
            "{} files were removed on the server; rerun with --delete-removed to delete them",
            summary.kept
        );
    }
    if summary.restart_required {
        println!("Restart the game to load the updated mods");
    }
}
