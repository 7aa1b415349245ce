//! Hash command implementation.

use modsync_core::{fingerprint, HashConfig};
use serde::Serialize;
use std::path::Path;

/// Fingerprint of one file.
#[derive(Debug, Serialize)]
pub struct HashResult {
    /// File path as given.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Fingerprint, lowercase hex.
    pub hash: String,
}

/// Runs the hash command.
pub fn run(file: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = HashResult {
        path: file.display().to_string(),
        size: std::fs::metadata(file)?.len(),
        hash: fingerprint(file, &HashConfig::default())?,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => println!("{}  {}", result.hash, result.path),
    }
    Ok(())
}
