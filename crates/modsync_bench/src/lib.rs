//! Benchmark utilities.

use modsync_core::{ModFile, ModFileIndex};

/// Generate deterministic file contents of the specified size.
pub fn file_data(size: usize, seed: u8) -> Vec<u8> {
    (0..size)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// Copy of `index` where every `step`-th file has a different hash.
pub fn touch_every(index: &ModFileIndex, step: usize) -> ModFileIndex {
    let mut touched = ModFileIndex::new();
    for (sync_path, files) in index.iter() {
        let entry = touched.entry(sync_path);
        for (i, (path, file)) in files.iter().enumerate() {
            let file = if step > 0 && i % step == 0 {
                ModFile::new(format!("{}ff", file.hash))
            } else {
                file.clone()
            };
            entry.insert(path, file);
        }
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use modsync_testkit::synthetic_index;

    #[test]
    fn touch_every_changes_a_fraction() {
        let index = synthetic_index("plugins", 100, 1);
        let touched = touch_every(&index, 10);

        let before = index.get("plugins").unwrap();
        let after = touched.get("plugins").unwrap();
        let changed = before
            .iter()
            .filter(|(path, file)| after.get(path).unwrap().hash != file.hash)
            .count();
        assert_eq!(changed, 10);
    }

    #[test]
    fn file_data_is_deterministic() {
        assert_eq!(file_data(64, 3), file_data(64, 3));
        assert_ne!(file_data(64, 3), file_data(64, 4));
    }
}
