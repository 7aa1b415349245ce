//! Client version negotiation.

use semver::Version;

/// Oldest client that understands the current response shapes.
pub const MIN_CLIENT_VERSION: Version = Version::new(0, 8, 0);

/// How a request should be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientKind {
    /// A client that speaks the current protocol.
    Current(Version),
    /// A client without a usable version; gets the fallback bodies.
    Legacy,
}

impl ClientKind {
    /// Returns true for legacy clients.
    pub fn is_legacy(&self) -> bool {
        matches!(self, ClientKind::Legacy)
    }
}

/// Classifies a request by its `modsync-version` header.
///
/// A missing header, a value that is not semver, or a version older than
/// `minimum` all yield [`ClientKind::Legacy`].
pub fn negotiate(header: Option<&str>, minimum: &Version) -> ClientKind {
    let Some(raw) = header.map(str::trim).filter(|v| !v.is_empty()) else {
        return ClientKind::Legacy;
    };
    match Version::parse(raw.trim_start_matches('v')) {
        Ok(version) if version >= *minimum => ClientKind::Current(version),
        _ => ClientKind::Legacy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_header_is_legacy() {
        assert!(negotiate(None, &MIN_CLIENT_VERSION).is_legacy());
        assert!(negotiate(Some("  "), &MIN_CLIENT_VERSION).is_legacy());
    }

    #[test]
    fn garbage_and_old_versions_are_legacy() {
        assert!(negotiate(Some("undefined"), &MIN_CLIENT_VERSION).is_legacy());
        assert!(negotiate(Some("0.7.9"), &MIN_CLIENT_VERSION).is_legacy());
    }

    #[test]
    fn current_versions() {
        assert_eq!(
            negotiate(Some("0.8.0"), &MIN_CLIENT_VERSION),
            ClientKind::Current(Version::new(0, 8, 0))
        );
        assert_eq!(
            negotiate(Some("v0.10.2"), &MIN_CLIENT_VERSION),
            ClientKind::Current(Version::new(0, 10, 2))
        );
    }
}
