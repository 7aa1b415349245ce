//! Diff command implementation.

use modsync_core::{diff, DiffResult, ModFileIndex, SyncPath};
use std::fmt::Write as _;
use std::path::Path;

/// Runs the diff command.
pub fn run(
    local: &Path,
    remote: &Path,
    previous: Option<&Path>,
    paths: &[String],
    enforced: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let local = read_index(local)?;
    let remote = read_index(remote)?;
    let previous = match previous {
        Some(path) => read_index(path)?,
        None => ModFileIndex::new(),
    };

    let names: Vec<String> = if paths.is_empty() {
        remote.iter().map(|(name, _)| name.to_string()).collect()
    } else {
        paths.to_vec()
    };
    let sync_paths: Vec<SyncPath> = names
        .into_iter()
        .map(|name| SyncPath::new(name).with_enforced(enforced))
        .collect();

    let result = diff(&sync_paths, &local, &remote, &previous);
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print!("{}", render_text(&result)),
    }
    Ok(())
}

fn read_index(path: &Path) -> Result<ModFileIndex, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path).map_err(|e| format!("Cannot read {:?}: {e}", path))?;
    let index: ModFileIndex =
        serde_json::from_slice(&bytes).map_err(|e| format!("Invalid index {:?}: {e}", path))?;
    Ok(index)
}

/// Renders a diff as a per-SyncPath listing.
pub fn render_text(result: &DiffResult) -> String {
    if result.is_empty() {
        return "Everything is in sync\n".to_string();
    }

    let mut out = String::new();
    for (sync_path, changes) in result.iter().filter(|(_, c)| !c.is_empty()) {
        let _ = writeln!(out, "{sync_path}");
        for path in &changes.added {
            let _ = writeln!(out, "  + {path}");
        }
        for path in &changes.updated {
            let _ = writeln!(out, "  ~ {path}");
        }
        for path in &changes.removed {
            let _ = writeln!(out, "  - {path}");
        }
        for path in &changes.created_directories {
            let _ = writeln!(out, "  d {path}/");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use modsync_core::{ModFile, ModFiles};

    fn index(entries: &[(&str, &str)]) -> ModFileIndex {
        let files: ModFiles = entries
            .iter()
            .map(|(path, hash)| (*path, ModFile::new(*hash)))
            .collect();
        let mut index = ModFileIndex::new();
        index.insert("plugins", files);
        index
    }

    #[test]
    fn renders_changes() {
        let sync_paths = [SyncPath::new("plugins")];
        let local = index(&[("plugins/Old.dll", "01"), ("plugins/Same.dll", "02")]);
        let remote = index(&[("plugins/New.dll", "03"), ("plugins/Same.dll", "02")]);

        let text = render_text(&diff(&sync_paths, &local, &remote, &ModFileIndex::new()));
        assert_eq!(text, "plugins\n  + plugins/New.dll\n  - plugins/Old.dll\n");
    }

    #[test]
    fn renders_in_sync() {
        let sync_paths = [SyncPath::new("plugins")];
        let both = index(&[("plugins/Same.dll", "02")]);
        let text = render_text(&diff(&sync_paths, &both, &both, &both));
        assert_eq!(text, "Everything is in sync\n");
    }

    #[test]
    fn reads_saved_index() {
        let dir = modsync_testkit::ModTree::new();
        dir.write("remote.json", r#"{"plugins": {"plugins\\SAIN.dll": {"hash": "aa"}}}"#);

        let index = read_index(&dir.path("remote.json")).unwrap();
        assert!(index.get("plugins").unwrap().contains("plugins/SAIN.dll"));
        assert!(read_index(&dir.path("missing.json")).is_err());
    }
}
