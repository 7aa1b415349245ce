//! Response bodies and JSON helpers.

use crate::error::ProtocolResult;
use modsync_core::{ModFileIndex, SyncPath};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Body of `/modsync/version`: the server version as a JSON string.
pub type VersionResponse = String;

/// Body of `/modsync/paths`.
pub type PathsResponse = Vec<SyncPath>;

/// Body of `/modsync/hashes`.
pub type HashesResponse = ModFileIndex;

/// Encodes a response body.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> ProtocolResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decodes a response body.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}
