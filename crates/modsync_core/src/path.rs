//! Relative path helpers.
//!
//! Every relative path inside an index uses `/` as its separator. The
//! target filesystem is case-insensitive, so identity is decided by
//! [`path_key`] while the original casing is kept for display and transfer.

use crate::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Normalizes a relative path to forward slashes.
///
/// Backslashes become `/`, empty and `.` segments are dropped and any
/// leading or trailing separator is removed. `..` segments are kept; use
/// [`resolve_within`] to validate them against a root.
pub fn normalize(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns the case-insensitive identity of a relative path.
pub fn path_key(path: &str) -> String {
    normalize(path).to_lowercase()
}

/// Renders a normalized path with the given separator.
pub fn to_native(path: &str, separator: char) -> String {
    if separator == '/' {
        normalize(path)
    } else {
        normalize(path).replace('/', &separator.to_string())
    }
}

/// Returns true for `C:`-style prefixes and rooted paths.
fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Resolves `relative` under `root`, rejecting anything that escapes it.
///
/// The check is lexical: `..` segments may be used as long as they never
/// climb above `root`. Absolute paths are always rejected.
pub fn resolve_within(root: &Path, relative: &str) -> CoreResult<PathBuf> {
    if is_absolute(relative) {
        return Err(CoreError::Config(format!(
            "path '{relative}' must be relative to the root"
        )));
    }

    let mut parts: Vec<&str> = Vec::new();
    for segment in relative.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(CoreError::Config(format!(
                        "path '{relative}' escapes the root"
                    )));
                }
            }
            other => parts.push(other),
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(parts);
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_separators() {
        assert_eq!(normalize(r"BepInEx\plugins\SAIN.dll"), "BepInEx/plugins/SAIN.dll");
        assert_eq!(normalize("./plugins//SAIN.dll/"), "plugins/SAIN.dll");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn keys_ignore_case_and_separator() {
        assert_eq!(path_key(r"plugins\SAIN.dll"), path_key("Plugins/sain.DLL"));
    }

    #[test]
    fn native_rendering() {
        assert_eq!(to_native("plugins/SAIN.dll", '\\'), r"plugins\SAIN.dll");
        assert_eq!(to_native(r"plugins\SAIN.dll", '/'), "plugins/SAIN.dll");
    }

    #[test]
    fn resolve_inside_root() {
        let root = Path::new("/srv/game");
        assert_eq!(
            resolve_within(root, "user/mods/../mods/SAIN").unwrap(),
            PathBuf::from("/srv/game/user/mods/SAIN")
        );
        assert_eq!(resolve_within(root, ".").unwrap(), PathBuf::from("/srv/game"));
    }

    #[test]
    fn resolve_rejects_escape() {
        let root = Path::new("/srv/game");
        assert!(resolve_within(root, "../secret").unwrap_err().is_config());
        assert!(resolve_within(root, r"plugins\..\..\x").unwrap_err().is_config());
        assert!(resolve_within(root, "/etc/passwd").unwrap_err().is_config());
        assert!(resolve_within(root, r"C:\Windows").unwrap_err().is_config());
    }
}
