//! # ModSync Engine
//!
//! Client side of ModSync: keeps a local game directory in step with the
//! mod tree a server publishes.
//!
//! This crate provides:
//! - Sync session state machine (idle → connecting → scanning → downloading → synced)
//! - A transport abstraction with HTTP, loopback and mock implementations
//! - A download orchestrator with bounded concurrency, fixed-delay retries
//!   and cooperative cancellation
//! - Persisted state (previous-sync snapshot and local exclusions)
//!
//! ## Architecture
//!
//! One cycle runs in two halves:
//! 1. Plan: fetch the server version, SyncPaths and remote index, scan the
//!    local tree and diff both against the previous snapshot
//! 2. Apply: create missing directories, download added and updated files,
//!    optionally delete removed files, then persist the new snapshot
//!
//! ## Key Invariants
//!
//! - A locally modified file is never overwritten unless its SyncPath is enforced
//! - Locally excluded or no-sync-marked files are never downloaded or removed
//! - The snapshot is replaced only after every transfer succeeded
//! - Cancellation is not a failure and leaves completed files in place
//!
//! ## Example
//!
//! ```no_run
//! # async fn demo() -> modsync_engine::SyncResult<()> {
//! use modsync_engine::{HttpTransport, SyncConfig, SyncSession};
//!
//! let config = SyncConfig::new("http://127.0.0.1:6969", "/games/spt");
//! let transport = HttpTransport::from_config(&config)?;
//! let session = SyncSession::new(config, transport);
//!
//! let result = session.sync().await?;
//! println!("downloaded {} files", result.downloaded.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod download;
mod error;
mod http;
mod state;
mod store;
mod transport;

pub use config::{RetryConfig, SyncConfig};
pub use download::{
    partial_path, DownloadReport, DownloadTask, Downloader, PARTIAL_PATTERN, PARTIAL_SUFFIX,
};
pub use error::{SyncError, SyncResult};
pub use http::{HttpTransport, LoopbackResponse, LoopbackServer, LoopbackTransport};
pub use state::{SyncCycleResult, SyncPlan, SyncSession, SyncState, SyncStats};
pub use store::{StateStore, EXCLUSIONS_FILE, PREVIOUS_SYNC_FILE};
pub use transport::{MockTransport, ModSyncTransport};
