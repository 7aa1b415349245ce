//! Scan command implementation.

use modsync_core::{ExclusionSet, ScanOptions, Scanner, SyncPath};
use std::path::Path;

/// Runs the scan command.
pub async fn run(
    root: &Path,
    paths: &[String],
    excludes: &[String],
    concurrency: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !root.is_dir() {
        return Err(format!("No game directory at {:?}", root).into());
    }

    let sync_paths: Vec<SyncPath> = paths.iter().map(|p| SyncPath::new(p.as_str())).collect();
    let local = ExclusionSet::new(excludes)?;
    let scanner = Scanner::with_options(root, ScanOptions::default().with_concurrency(concurrency));
    let index = scanner
        .scan(&sync_paths, &ExclusionSet::remote_defaults(), &local)
        .await?;

    let json = serde_json::to_string_pretty(&index)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("Wrote {} files to {}", index.file_count(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
