//! # ModSync Server
//!
//! Remote side of ModSync: serves the SyncPath list, the remote file
//! index and file contents to clients.
//!
//! This crate provides:
//! - `/modsync/version`, `/modsync/paths`, `/modsync/hashes` and
//!   `/modsync/fetch/{path}` handlers
//! - A glob-based route table
//! - Fallback bodies for legacy clients
//! - Start-up validation of the configured SyncPaths
//!
//! # Architecture
//!
//! The crate is transport-free. An HTTP listener turns each request into
//! an [`HttpRequest`], passes it to [`ModSyncServer::handle`] and writes
//! the returned [`HttpResponse`]. Errors never escape `handle`: they are
//! logged and converted into a status code and message.
//!
//! ```no_run
//! # async fn demo() -> modsync_server::ServerResult<()> {
//! use modsync_core::SyncPath;
//! use modsync_server::{HttpRequest, ModSyncServer, ServerConfig};
//!
//! let config = ServerConfig::new("/srv/spt").with_sync_paths(vec![
//!     SyncPath::new("BepInEx/plugins"),
//!     SyncPath::new("BepInEx/config").with_restart_required(false),
//! ]);
//! let server = ModSyncServer::new(config)?;
//!
//! let request = HttpRequest::get("/modsync/hashes").with_header("modsync-version", "0.9.0");
//! let response = server.handle(&request).await;
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod http;
mod router;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{
    FetchedFile, HandlerContext, HashesReply, PathsReply, RequestHandler, WireIndex,
};
pub use http::{content_type_for, HttpRequest, HttpResponse, ResponseBody};
pub use router::{Endpoint, RouteTable};
pub use server::ModSyncServer;
