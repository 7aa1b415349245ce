//! Endpoint paths, the negotiation header and request-path encoding.

use crate::error::{ProtocolError, ProtocolResult};
use modsync_core::normalize;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Server version endpoint.
pub const VERSION_PATH: &str = "/modsync/version";
/// SyncPath list endpoint.
pub const PATHS_PATH: &str = "/modsync/paths";
/// Remote index endpoint.
pub const HASHES_PATH: &str = "/modsync/hashes";
/// Prefix of the file download endpoint.
pub const FETCH_PREFIX: &str = "/modsync/fetch/";
/// Header carrying the client version on every request.
pub const VERSION_HEADER: &str = "modsync-version";

/// Characters left intact when encoding a path as a single URL component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Builds the fetch request path for a relative file path.
///
/// The whole path, separators included, is encoded as one component.
pub fn encode_fetch_path(relative: &str) -> String {
    let normalized = normalize(relative);
    format!(
        "{FETCH_PREFIX}{}",
        utf8_percent_encode(&normalized, COMPONENT)
    )
}

/// Recovers the relative file path from a fetch request path.
///
/// Any query string is ignored. The result is normalized to forward
/// slashes; containment within the sync roots is checked by the caller.
pub fn decode_fetch_path(request_path: &str) -> ProtocolResult<String> {
    let path = request_path
        .split_once('?')
        .map_or(request_path, |(path, _)| path);
    let encoded = path
        .strip_prefix(FETCH_PREFIX)
        .ok_or_else(|| ProtocolError::invalid_fetch_path(request_path))?;

    let decoded = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| ProtocolError::invalid_fetch_path(format!("{request_path}: {e}")))?;

    let relative = normalize(&decoded);
    if relative.is_empty() {
        return Err(ProtocolError::invalid_fetch_path(request_path));
    }
    Ok(relative)
}

/// Builds the query string restricting `/modsync/hashes` to some SyncPaths.
///
/// Returns an empty string when `paths` is empty.
pub fn hashes_query<S: AsRef<str>>(paths: &[S]) -> String {
    let params: Vec<String> = paths
        .iter()
        .map(|p| format!("path={}", utf8_percent_encode(p.as_ref(), COMPONENT)))
        .collect();
    if params.is_empty() {
        String::new()
    } else {
        format!("?{}", params.join("&"))
    }
}

/// Extracts the repeated `path` parameters from a query string.
///
/// Accepts the query with or without its leading `?`. Values are
/// normalized to forward slashes.
pub fn parse_path_filter(query: &str) -> Vec<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| *key == "path")
        .map(|(_, value)| {
            let value = value.replace('+', " ");
            normalize(&percent_decode_str(&value).decode_utf8_lossy())
        })
        .filter(|value| !value.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fetch_path_encodes_separators() {
        assert_eq!(
            encode_fetch_path("BepInEx/plugins/My Mod.dll"),
            "/modsync/fetch/BepInEx%2Fplugins%2FMy%20Mod.dll"
        );
        assert_eq!(
            encode_fetch_path("BepInEx\\plugins\\SAIN.dll"),
            "/modsync/fetch/BepInEx%2Fplugins%2FSAIN.dll"
        );
    }

    #[test]
    fn fetch_path_decodes() {
        assert_eq!(
            decode_fetch_path("/modsync/fetch/BepInEx%2Fplugins%2FSAIN.dll").unwrap(),
            "BepInEx/plugins/SAIN.dll"
        );
        assert_eq!(
            decode_fetch_path("/modsync/fetch/BepInEx%5Cplugins%5CSAIN.dll?x=1").unwrap(),
            "BepInEx/plugins/SAIN.dll"
        );
        // Unencoded separators are accepted too
        assert_eq!(
            decode_fetch_path("/modsync/fetch/user/mods/a.json").unwrap(),
            "user/mods/a.json"
        );
    }

    #[test]
    fn fetch_path_rejects_garbage() {
        assert!(decode_fetch_path("/modsync/hashes").is_err());
        assert!(decode_fetch_path("/modsync/fetch/").is_err());
        assert!(decode_fetch_path("/modsync/fetch/%FF%FE").is_err());
    }

    #[test]
    fn traversal_survives_decoding() {
        // Rejection happens where the path is resolved against a root.
        assert_eq!(
            decode_fetch_path("/modsync/fetch/..%2F..%2Fsecret").unwrap(),
            "../../secret"
        );
    }

    #[test]
    fn path_filter_query() {
        assert_eq!(hashes_query::<&str>(&[]), "");
        let query = hashes_query(&["BepInEx/plugins", "user mods"]);
        assert_eq!(query, "?path=BepInEx%2Fplugins&path=user%20mods");
        assert_eq!(
            parse_path_filter(&query),
            vec!["BepInEx/plugins", "user mods"]
        );
    }

    #[test]
    fn path_filter_ignores_other_params() {
        assert_eq!(
            parse_path_filter("a=1&path=BepInEx%5Cconfig&path=&b&path=user+mods"),
            vec!["BepInEx/config", "user mods"]
        );
        assert!(parse_path_filter("").is_empty());
    }

    proptest! {
        #[test]
        fn fetch_path_roundtrip(segments in prop::collection::vec("[A-Za-z0-9 _.#%&?+-]{1,8}", 1..4)) {
            let segments: Vec<String> = segments
                .into_iter()
                .filter(|s| s != "." && s != "..")
                .collect();
            prop_assume!(!segments.is_empty());
            let relative = segments.join("/");
            let decoded = decode_fetch_path(&encode_fetch_path(&relative)).unwrap();
            prop_assert_eq!(decoded, normalize(&relative));
        }
    }
}
