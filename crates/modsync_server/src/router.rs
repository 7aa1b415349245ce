//! Route table built from glob patterns.

use modsync_core::{CoreResult, Glob};
use modsync_protocol::{HASHES_PATH, PATHS_PATH, VERSION_PATH};

/// The endpoint a request path maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/modsync/version`
    Version,
    /// `/modsync/paths`
    Paths,
    /// `/modsync/hashes`
    Hashes,
    /// `/modsync/fetch/**`
    Fetch,
}

/// Ordered list of route patterns; the first match wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<(Glob, Endpoint)>,
}

impl RouteTable {
    /// Builds the standard ModSync routes.
    pub fn new() -> CoreResult<Self> {
        let routes = vec![
            (Glob::new(VERSION_PATH)?, Endpoint::Version),
            (Glob::new(PATHS_PATH)?, Endpoint::Paths),
            (Glob::new(HASHES_PATH)?, Endpoint::Hashes),
            (Glob::new("/modsync/fetch/**")?, Endpoint::Fetch),
        ];
        Ok(Self { routes })
    }

    /// Finds the endpoint for a request path without its query string.
    pub fn resolve(&self, path: &str) -> Option<Endpoint> {
        self.routes
            .iter()
            .find(|(glob, _)| glob.test(path))
            .map(|(_, endpoint)| *endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_endpoints() {
        let routes = RouteTable::new().unwrap();
        assert_eq!(routes.resolve("/modsync/version"), Some(Endpoint::Version));
        assert_eq!(routes.resolve("/modsync/paths"), Some(Endpoint::Paths));
        assert_eq!(routes.resolve("/modsync/hashes"), Some(Endpoint::Hashes));
        assert_eq!(
            routes.resolve("/modsync/fetch/BepInEx%2Fplugins%2FSAIN.dll"),
            Some(Endpoint::Fetch)
        );
        assert_eq!(routes.resolve("/modsync/fetch/a/b/c"), Some(Endpoint::Fetch));
    }

    #[test]
    fn unknown_routes() {
        let routes = RouteTable::new().unwrap();
        assert_eq!(routes.resolve("/modsync"), None);
        assert_eq!(routes.resolve("/modsync/versions"), None);
        assert_eq!(routes.resolve("/client/game/start"), None);
    }
}
