//! Fixed responses for clients that predate version negotiation.
//!
//! Such clients only ever receive the bootstrap plugin and the updater,
//! and their hashes never match so the files are always re-fetched.

use modsync_core::to_native;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Client plugin binary, relative to the game root.
pub const BOOTSTRAP_PLUGIN: &str = "BepInEx/plugins/Corter-ModSync.dll";
/// Updater executable, relative to the game root.
pub const BOOTSTRAP_UPDATER: &str = "ModSync.Updater.exe";
/// Both bootstrap files.
pub const BOOTSTRAP_FILES: [&str; 2] = [BOOTSTRAP_PLUGIN, BOOTSTRAP_UPDATER];
/// Checksum that never matches a real file.
pub const LEGACY_CRC_SENTINEL: u32 = 999_999_999;

/// Hash entry in the legacy flat index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyHash {
    /// Always [`LEGACY_CRC_SENTINEL`].
    pub crc: u32,
}

/// The SyncPath list served to legacy clients.
pub fn legacy_paths(separator: char) -> Vec<String> {
    BOOTSTRAP_FILES
        .iter()
        .map(|path| to_native(path, separator))
        .collect()
}

/// The flat hash map served to legacy clients.
pub fn legacy_hashes(separator: char) -> BTreeMap<String, LegacyHash> {
    legacy_paths(separator)
        .into_iter()
        .map(|path| {
            (
                path,
                LegacyHash {
                    crc: LEGACY_CRC_SENTINEL,
                },
            )
        })
        .collect()
}
