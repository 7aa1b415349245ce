//! # ModSync Protocol
//!
//! Wire contract between the ModSync server and its clients.
//!
//! This crate provides:
//! - Endpoint paths and the `modsync-version` negotiation header
//! - Encoding and decoding of `/modsync/fetch/{path}` request paths
//! - The `path` query filter accepted by `/modsync/hashes`
//! - JSON helpers for the response bodies
//! - Fixed fallback bodies served to legacy clients
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! # Endpoints
//!
//! | Endpoint | Response |
//! |---|---|
//! | `/modsync/version` | JSON string with the server version |
//! | `/modsync/paths` | JSON array of SyncPath descriptors |
//! | `/modsync/hashes` | nested map SyncPath → relative path → `{hash}` |
//! | `/modsync/fetch/{path}` | raw file bytes |

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod endpoint;
mod error;
mod legacy;
mod messages;
mod version;

pub use endpoint::{
    decode_fetch_path, encode_fetch_path, hashes_query, parse_path_filter, FETCH_PREFIX,
    HASHES_PATH, PATHS_PATH, VERSION_HEADER, VERSION_PATH,
};
pub use error::{ProtocolError, ProtocolResult};
pub use legacy::{
    legacy_hashes, legacy_paths, LegacyHash, BOOTSTRAP_FILES, BOOTSTRAP_PLUGIN, BOOTSTRAP_UPDATER,
    LEGACY_CRC_SENTINEL,
};
pub use messages::{decode_json, encode_json, HashesResponse, PathsResponse, VersionResponse};
pub use version::{negotiate, ClientKind, MIN_CLIENT_VERSION};
