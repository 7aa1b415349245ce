//! Property-based test generators using proptest.

use modsync_core::{path_key, ModFile, ModFiles, SyncPath};
use proptest::prelude::*;
use std::collections::HashSet;

/// Strategy for one path segment, mixing case.
pub fn segment_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9_-]{0,7}").expect("Invalid regex")
}

/// Strategy for a relative file path one to three segments deep.
pub fn relative_path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..4).prop_map(|segments| segments.join("/"))
}

/// Strategy for a file tree: unique paths (ignoring case) with contents.
///
/// No path is a prefix directory of another, so every entry can be
/// written as a file.
pub fn file_tree_strategy(max_files: usize) -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    prop::collection::vec(
        (
            relative_path_strategy(),
            prop::collection::vec(any::<u8>(), 0..256),
        ),
        0..max_files,
    )
    .prop_map(|entries| {
        let mut keys = HashSet::new();
        let mut kept: Vec<(String, Vec<u8>)> = Vec::new();
        for (path, contents) in entries {
            if keys.insert(path_key(&path)) {
                kept.push((path, contents));
            }
        }
        let keys: Vec<String> = kept.iter().map(|(p, _)| path_key(p)).collect();
        kept.into_iter()
            .filter(|(path, _)| {
                let own = format!("{}/", path_key(path));
                !keys.iter().any(|k| k.starts_with(&own))
            })
            .collect()
    })
}

/// Strategy for a [`ModFiles`] map with hashes from a small alphabet,
/// so that independent maps often agree.
pub fn mod_files_strategy(prefix: &'static str) -> impl Strategy<Value = ModFiles> {
    prop::collection::vec((segment_strategy(), "[abc]"), 0..12).prop_map(move |entries| {
        entries
            .into_iter()
            .map(|(name, hash)| (format!("{prefix}/{name}"), ModFile::new(hash)))
            .collect()
    })
}

/// Strategy for a SyncPath with arbitrary flags.
pub fn sync_path_strategy() -> impl Strategy<Value = SyncPath> {
    (
        relative_path_strategy(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(path, enabled, enforced, silent, restart)| {
            SyncPath::new(path)
                .with_enabled(enabled)
                .with_enforced(enforced)
                .with_silent(silent)
                .with_restart_required(restart)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn file_trees_have_unique_leaf_paths(tree in file_tree_strategy(16)) {
            let keys: Vec<String> = tree.iter().map(|(p, _)| path_key(p)).collect();
            let unique: HashSet<&String> = keys.iter().collect();
            prop_assert_eq!(unique.len(), keys.len());
            for key in &keys {
                let own = format!("{key}/");
                prop_assert!(!keys.iter().any(|k| k.starts_with(&own)));
            }
        }

        #[test]
        fn mod_files_live_under_prefix(files in mod_files_strategy("plugins")) {
            for (path, _) in files.iter() {
                prop_assert!(path.starts_with("plugins/"));
            }
        }

        #[test]
        fn sync_paths_are_normalized(sync_path in sync_path_strategy()) {
            prop_assert!(!sync_path.path.contains('\\'));
            let child = format!("{}/x", sync_path.path);
            prop_assert!(sync_path.contains(&child));
        }
    }
}
